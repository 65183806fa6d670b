use dotenv::dotenv;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use std::env;
use std::fmt;

const DEFAULT_DATABASE_URL: &str = "sqlite://fundbook.db";
const MEMORY_DATABASE_URL: &str = "memory";

/// Where the ledger lives for this process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerBackend {
    /// In-memory ledger; `seeded` loads the demo employees and expenses.
    InMemory { seeded: bool },
    Sqlite { path: String },
}

pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub log_level: String,
    pub dev_mode: bool,
    /// Minor-unit decimal places of the currency.
    pub currency_scale: u32,
    pub default_monthly_contribution: Decimal,
}

impl Config {
    fn from_env() -> Self {
        dotenv().ok();

        Self {
            port: env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            dev_mode: env::var("DEV_MODE")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            currency_scale: env::var("CURRENCY_SCALE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            default_monthly_contribution: env::var("DEFAULT_MONTHLY_CONTRIBUTION")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(|| Decimal::from(100_000)),
        }
    }

    pub fn ledger_backend(&self) -> LedgerBackend {
        if self.dev_mode {
            return LedgerBackend::InMemory { seeded: true };
        }
        if self.database_url == MEMORY_DATABASE_URL {
            return LedgerBackend::InMemory { seeded: false };
        }
        let path = self
            .database_url
            .strip_prefix("sqlite://")
            .or_else(|| self.database_url.strip_prefix("sqlite:"))
            .unwrap_or(&self.database_url);
        LedgerBackend::Sqlite { path: path.to_string() }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("database_url", &"<redacted>")
            .field("log_level", &self.log_level)
            .field("dev_mode", &self.dev_mode)
            .field("currency_scale", &self.currency_scale)
            .field("default_monthly_contribution", &self.default_monthly_contribution)
            .finish()
    }
}

// Global static accessible everywhere
pub static CONFIG: Lazy<Config> = Lazy::new(Config::from_env);
