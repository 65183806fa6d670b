pub mod in_memory;

use crate::core::errors::FundError;
use crate::core::models::AppLog;
use async_trait::async_trait;

/// Audit trail of user-visible actions. Operational logs go through `tracing`.
#[async_trait]
pub trait LoggingService: Send + Sync {
    async fn log_action(&self, action: &str, details: serde_json::Value, actor: Option<&str>) -> Result<(), FundError>;
    async fn get_logs(&self) -> Result<Vec<AppLog>, FundError>;
}
