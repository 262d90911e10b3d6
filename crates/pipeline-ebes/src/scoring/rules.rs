use super::{ScoreComponent, ScoreFactor, ScoreTable};

/// Running totals for both tables while a formula is applied.
#[derive(Debug, Default)]
pub(crate) struct Tally {
    pub components: Vec<ScoreComponent>,
    pub table1: f64,
    pub table2: f64,
}

impl Tally {
    /// Adds `count × weight` to the given table. Zero counts leave no component behind.
    pub fn credit(&mut self, table: ScoreTable, factor: ScoreFactor, count: u32, weight: f64) {
        if count == 0 {
            return;
        }

        let points = f64::from(count) * weight;
        self.push(
            table,
            factor,
            points,
            format!("{count} × {weight} = {points}"),
        );
    }

    /// Subtracts `count × weight` from Table 1, bounded by `cap` when one is given.
    pub fn penalty(&mut self, factor: ScoreFactor, count: u32, weight: f64, cap: Option<f64>) {
        if count == 0 {
            return;
        }

        let uncapped = f64::from(count) * weight;
        let points = cap.map_or(uncapped, |cap| uncapped.min(cap));
        let notes = match cap {
            Some(cap) if uncapped > cap => {
                format!("{count} × {weight} = {uncapped}, capped at {cap}")
            }
            _ => format!("{count} × {weight} = {points}"),
        };
        self.push(ScoreTable::Performance, factor, -points, notes);
    }

    /// Flat adjustment that does not scale with a count.
    pub fn flat(&mut self, factor: ScoreFactor, points: f64, notes: impl Into<String>) {
        self.push(ScoreTable::Performance, factor, points, notes.into());
    }

    fn push(&mut self, table: ScoreTable, factor: ScoreFactor, points: f64, notes: String) {
        match table {
            ScoreTable::Performance => self.table1 += points,
            ScoreTable::Engagement => self.table2 += points,
        }
        self.components.push(ScoreComponent {
            factor,
            table,
            points,
            notes,
        });
    }
}
