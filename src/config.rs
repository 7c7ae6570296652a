//! Run Configuration
//!
//! Built once at startup and passed by reference into the client and reconciler.

use crate::error::{Result, SyncError};
use std::fmt;
use std::path::PathBuf;

pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";
pub const DEFAULT_PORT: u16 = 25;
pub const DEFAULT_PROTOCOL: &str = "tcp";

/// Immutable configuration for a sync run
#[derive(Clone)]
pub struct Config {
    /// Private key backing the certificate in service today
    pub current_key: PathBuf,
    /// Private key of the certificate that will replace it
    pub next_key: PathBuf,
    /// Cloudflare zone ID holding the records
    pub zone_id: String,
    /// Cloudflare API token with DNS edit permission
    pub api_token: String,
    /// Domain the service runs on (e.g. mail.example.com)
    pub domain: String,
    pub port: u16,
    pub protocol: String,
    pub api_base: String,
}

impl Config {
    /// Reject empty or out of range values
    pub fn validate(&self) -> Result<()> {
        if self.zone_id.trim().is_empty() {
            return Err(SyncError::Config("zone ID is empty".to_string()));
        }
        if self.api_token.trim().is_empty() {
            return Err(SyncError::Config("API token is empty".to_string()));
        }
        if self.domain.trim().trim_end_matches('.').is_empty() {
            return Err(SyncError::Config("domain is empty".to_string()));
        }
        if self.protocol.trim().is_empty() {
            return Err(SyncError::Config("protocol is empty".to_string()));
        }
        if self.port == 0 {
            return Err(SyncError::Config("port must be between 1 and 65535".to_string()));
        }
        if self.current_key.as_os_str().is_empty() || self.next_key.as_os_str().is_empty() {
            return Err(SyncError::Config("key file path is empty".to_string()));
        }
        Ok(())
    }

    /// TLSA owner name, `_{port}._{protocol}.{domain}`
    pub fn record_name(&self) -> String {
        format!(
            "_{}._{}.{}",
            self.port,
            self.protocol.trim().to_lowercase(),
            self.domain.trim().trim_end_matches('.').to_lowercase()
        )
    }
}

// Keeps the API token out of logs
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("current_key", &self.current_key)
            .field("next_key", &self.next_key)
            .field("zone_id", &self.zone_id)
            .field("api_token", &"<redacted>")
            .field("domain", &self.domain)
            .field("port", &self.port)
            .field("protocol", &self.protocol)
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            current_key: PathBuf::from("/etc/ssl/current.key"),
            next_key: PathBuf::from("/etc/ssl/next.key"),
            zone_id: "023e105f4ecef8ad9ca31a8372d0c353".to_string(),
            api_token: "secret-token".to_string(),
            domain: "mail.example.com".to_string(),
            port: DEFAULT_PORT,
            protocol: DEFAULT_PROTOCOL.to_string(),
            api_base: CLOUDFLARE_API_BASE.to_string(),
        }
    }

    #[test]
    fn test_record_name_defaults() {
        assert_eq!(config().record_name(), "_25._tcp.mail.example.com");
    }

    #[test]
    fn test_record_name_custom_port_and_trailing_dot() {
        let cfg = Config {
            port: 443,
            protocol: "TCP".to_string(),
            domain: "www.example.com.".to_string(),
            ..config()
        };
        assert_eq!(cfg.record_name(), "_443._tcp.www.example.com");
    }

    #[test]
    fn test_record_name_ignores_domain_case() {
        let cfg = Config {
            domain: "Mail.Example.COM".to_string(),
            ..config()
        };
        assert_eq!(cfg.record_name(), config().record_name());
    }

    #[test]
    fn test_validate_ok() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_values() {
        let cases = [
            Config { zone_id: String::new(), ..config() },
            Config { api_token: "  ".to_string(), ..config() },
            Config { domain: ".".to_string(), ..config() },
            Config { protocol: String::new(), ..config() },
            Config { port: 0, ..config() },
            Config { next_key: PathBuf::new(), ..config() },
        ];

        for cfg in cases {
            assert!(matches!(cfg.validate(), Err(SyncError::Config(_))), "{:?}", cfg);
        }
    }

    #[test]
    fn test_debug_redacts_token() {
        let rendered = format!("{:?}", config());
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("<redacted>"));
    }
}
