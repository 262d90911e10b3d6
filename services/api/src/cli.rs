use crate::demo::{run_demo, DemoArgs};
use crate::scorecard::{run_score, ScoreArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use pipeline_ebes::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Pipeline EBES",
    about = "Score recruiting pipeline effort and run the dropout approval workflow",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Batch-score aggregate rows from a CSV file and print the results as JSON
    Score(ScoreArgs),
    /// Walk a dropout from recording to decision against an in-memory pipeline
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Score(args) => run_score(args),
        Command::Demo(args) => run_demo(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["pipeline-ebes-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn score_takes_a_kind_and_input() {
        let cli = Cli::try_parse_from([
            "pipeline-ebes-api",
            "score",
            "recruitment-manager",
            "--input",
            "team.csv",
        ])
        .expect("parses");
        assert!(matches!(cli.command, Some(Command::Score(_))));
    }

    #[test]
    fn unknown_score_kind_is_rejected() {
        let parsed =
            Cli::try_parse_from(["pipeline-ebes-api", "score", "intern", "--input", "x.csv"]);
        assert!(parsed.is_err());
    }
}
