//! Role admission and status lifecycle.

pub mod router;
pub mod service;

pub use router::role_router;
pub use service::{OpenRoleRequest, RoleService, RoleStatusChange};
