pub mod allocation;
pub mod contribution;
pub mod draft;
pub mod errors;
pub mod models;
pub mod reconciliation;
pub mod roster;
pub mod services;
pub mod summary;
