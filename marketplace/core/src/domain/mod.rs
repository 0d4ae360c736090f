pub mod project;
pub mod events;
pub mod repository;
pub mod auth;
pub mod ledger;

pub use project::*;
pub use events::ProjectEvent;
pub use repository::{ProjectFilter, ProjectRepository, RepositoryError};
pub use auth::{AuthGate, Identity, Role};
pub use ledger::EarningsLedger;
