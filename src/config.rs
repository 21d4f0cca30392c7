use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_DB_PATH: &str = "/var/lib/kyc/kyc.db";
const DEFAULT_TEMP_DIR: &str = "temp";
const DEFAULT_LEDGER_TIMEOUT_SECS: u64 = 30;
const DEFAULT_NOTIFY_TIMEOUT_SECS: u64 = 10;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

/// Service configuration, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub db_path: String,
    pub temp_dir: PathBuf,
    pub ledger_rpc_url: String,
    pub contract_address: String,
    pub operator_key: String,
    /// When set, an address to register as a minter at startup.
    pub register_minter: Option<String>,
    /// Shared secret guarding the admin review/sign endpoints. Unset means
    /// the endpoints are open (local development only).
    pub admin_api_key: Option<String>,
    pub backend_url: Option<String>,
    pub internal_api_key: Option<String>,
    pub ledger_timeout: Duration,
    pub notify_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr = optional("KYC_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = bind_addr
            .parse()
            .map_err(|_| ConfigError::Invalid("KYC_BIND_ADDR", bind_addr.clone()))?;

        Ok(Self {
            bind_addr,
            db_path: optional("KYC_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            temp_dir: PathBuf::from(
                optional("KYC_TEMP_DIR").unwrap_or_else(|| DEFAULT_TEMP_DIR.to_string()),
            ),
            ledger_rpc_url: required("LEDGER_RPC_URL")?,
            contract_address: required("KYC_CONTRACT_ADDRESS")?,
            operator_key: required("ADMIN_OPERATOR_KEY")?,
            register_minter: optional("KYC_REGISTER_MINTER"),
            admin_api_key: optional("ADMIN_API_KEY"),
            backend_url: optional("TRADECHAIN_BACKEND_URL"),
            internal_api_key: optional("INTERNAL_API_KEY"),
            ledger_timeout: duration_secs("LEDGER_TIMEOUT_SECS", DEFAULT_LEDGER_TIMEOUT_SECS)?,
            notify_timeout: duration_secs("NOTIFY_TIMEOUT_SECS", DEFAULT_NOTIFY_TIMEOUT_SECS)?,
        })
    }
}

fn optional(name: &'static str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn duration_secs(name: &'static str, default: u64) -> Result<Duration, ConfigError> {
    match optional(name) {
        None => Ok(Duration::from_secs(default)),
        Some(raw) => raw
            .parse()
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::Invalid(name, raw)),
    }
}
