//! The catalog engine and its reconciliation machinery

mod config;
mod create;
mod delete;
mod detail;
mod engine;
mod events;
mod lanes;
mod outcome;
mod recovery;
mod state;
mod update;


pub use config::EngineConfig;
pub use delete::DeleteOutcome;
pub use detail::DetailHandle;
pub use engine::CatalogEngine;
pub use events::{CatalogEvent, RefreshReport};
pub use outcome::{Optimistic, Pending};
pub use recovery::RecoveryReport;
pub use state::Orphan;
