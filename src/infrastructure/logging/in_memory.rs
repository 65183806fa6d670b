use crate::core::errors::FundError;
use crate::core::models::AppLog;
use crate::infrastructure::logging::LoggingService;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct InMemoryLogging {
    logs: Arc<RwLock<Vec<AppLog>>>,
}

impl InMemoryLogging {
    pub fn new() -> Self {
        InMemoryLogging {
            logs: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

#[async_trait]
impl LoggingService for InMemoryLogging {
    async fn log_action(&self, action: &str, details: serde_json::Value, actor: Option<&str>) -> Result<(), FundError> {
        let details = serde_json::from_value(details)
            .map_err(|e| FundError::LoggingError(format!("Audit details must be a JSON object: {}", e)))?;
        let mut logs = self.logs.write().await;
        logs.push(AppLog {
            id: Uuid::new_v4().to_string(),
            action: action.to_string(),
            actor: actor.map(String::from),
            details,
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }

    /// Oldest first, in the order actions were recorded.
    async fn get_logs(&self) -> Result<Vec<AppLog>, FundError> {
        let logs = self.logs.read().await;
        Ok(logs.clone())
    }
}
