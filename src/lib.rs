pub mod api;
pub mod config;
pub mod constants;
pub mod core;
pub mod infrastructure;

pub use crate::core::errors::FundError;
pub use crate::core::services::FundService;
pub use crate::infrastructure::logging::in_memory::InMemoryLogging;
pub use crate::infrastructure::storage::in_memory::InMemoryLedger;
pub use crate::infrastructure::storage::sqlite::SqliteLedger;

#[cfg(test)]
mod tests;
