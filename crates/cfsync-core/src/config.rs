//! Configuration types for the cfnat-sync system
//!
//! Configuration is a single YAML file loaded once at startup:
//!
//! ```yaml
//! cloudflare:
//!   email: ops@example.com
//!   api_key: "..."
//!   zone_id: "..."
//!   record_names:
//!     - fast.example.com
//!     - edge.example.com
//! sync_count: 3
//! colo: HKG
//! port: 443
//! ```
//!
//! Top-level keys other than the reserved ones are pass-through
//! arguments forwarded verbatim to the discovery subprocess's command
//! line. Configuration errors are fatal at startup, before any cache
//! or reconciliation activity begins.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Cloudflare account and zone settings
    pub cloudflare: CloudflareConfig,

    /// Per-family cache bound (maximum addresses synced per record type)
    #[serde(default = "default_sync_count")]
    pub sync_count: usize,

    /// Cache log file path
    #[serde(default = "default_log_file")]
    pub log_file: String,

    /// Discovery program to spawn
    #[serde(default = "default_program")]
    pub program: String,

    /// Pass-through arguments for the discovery subprocess
    #[serde(flatten)]
    pub discovery: DiscoveryArgs,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        serde_yaml::from_str(&content)
            .map_err(|e| Error::config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Validate the configuration
    ///
    /// Fatal at startup: missing credentials, an empty or malformed
    /// record-name list, or a zero sync count all reject the config.
    pub fn validate(&self) -> Result<()> {
        self.cloudflare.validate()?;

        if self.sync_count == 0 {
            return Err(Error::config("sync_count must be at least 1"));
        }
        if self.log_file.is_empty() {
            return Err(Error::config("log_file cannot be empty"));
        }
        if self.program.is_empty() {
            return Err(Error::config("program cannot be empty"));
        }

        Ok(())
    }
}

/// Cloudflare account and zone configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudflareConfig {
    /// Account email (sent as `X-Auth-Email`)
    pub email: String,

    /// Account API key (sent as `X-Auth-Key`)
    pub api_key: String,

    /// Zone id holding the managed records
    pub zone_id: String,

    /// Record names to keep synchronized
    pub record_names: Vec<String>,
}

impl CloudflareConfig {
    /// Validate the Cloudflare configuration
    pub fn validate(&self) -> Result<()> {
        if self.email.is_empty() {
            return Err(Error::config("cloudflare.email cannot be empty"));
        }
        if self.api_key.is_empty() {
            return Err(Error::config("cloudflare.api_key cannot be empty"));
        }
        if self.zone_id.is_empty() {
            return Err(Error::config("cloudflare.zone_id cannot be empty"));
        }
        if self.record_names.is_empty() {
            return Err(Error::config(
                "cloudflare.record_names must contain at least one record name",
            ));
        }
        for name in &self.record_names {
            validate_record_name(name)?;
        }
        Ok(())
    }
}

/// Pass-through arguments for the discovery subprocess
///
/// Each set field becomes one `-key=value` flag on the child's command
/// line, in this fixed order. None of these are interpreted here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryArgs {
    pub colo: Option<String>,
    pub port: Option<u16>,
    pub addr: Option<String>,
    pub ips: Option<String>,
    pub delay: Option<u64>,
    pub ipnum: Option<u32>,
    pub num: Option<u32>,
    pub task: Option<u32>,
}

impl DiscoveryArgs {
    /// Render the set fields as subprocess command-line flags
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(ref colo) = self.colo {
            args.push(format!("-colo={}", colo));
        }
        if let Some(port) = self.port {
            args.push(format!("-port={}", port));
        }
        if let Some(ref addr) = self.addr {
            args.push(format!("-addr={}", addr));
        }
        if let Some(ref ips) = self.ips {
            args.push(format!("-ips={}", ips));
        }
        if let Some(delay) = self.delay {
            args.push(format!("-delay={}", delay));
        }
        if let Some(ipnum) = self.ipnum {
            args.push(format!("-ipnum={}", ipnum));
        }
        if let Some(num) = self.num {
            args.push(format!("-num={}", num));
        }
        if let Some(task) = self.task {
            args.push(format!("-task={}", task));
        }
        args
    }
}

/// Validate a DNS record name per RFC 1035 basics
fn validate_record_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::config("record name cannot be empty"));
    }
    if name.len() > 253 {
        return Err(Error::config(format!(
            "record name too long: {} chars (max 253): {}",
            name.len(),
            name
        )));
    }

    for label in name.split('.') {
        if label.is_empty() {
            return Err(Error::config(format!(
                "record name has an empty label: '{}'",
                name
            )));
        }
        if label.len() > 63 {
            return Err(Error::config(format!(
                "record label too long: {} chars (max 63): '{}'",
                label.len(),
                label
            )));
        }
        if !label.chars().all(|c| c.is_alphanumeric() || c == '-') {
            return Err(Error::config(format!(
                "record label contains invalid characters: '{}'",
                label
            )));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::config(format!(
                "record label cannot start or end with a hyphen: '{}'",
                label
            )));
        }
    }

    Ok(())
}

fn default_sync_count() -> usize {
    1
}

fn default_log_file() -> String {
    "cfnat_log.txt".to_string()
}

fn default_program() -> String {
    "cfnat".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            cloudflare: CloudflareConfig {
                email: "ops@example.com".to_string(),
                api_key: "k".repeat(37),
                zone_id: "0123456789abcdef".to_string(),
                record_names: vec!["fast.example.com".to_string()],
            },
            sync_count: 1,
            log_file: default_log_file(),
            program: default_program(),
            discovery: DiscoveryArgs::default(),
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn empty_credentials_are_fatal() {
        let mut config = base_config();
        config.cloudflare.api_key.clear();
        assert!(config.validate().is_err());

        let mut config = base_config();
        config.cloudflare.email.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_record_list_is_fatal() {
        let mut config = base_config();
        config.cloudflare.record_names.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_record_name_is_fatal() {
        for bad in ["", "a..b", "-bad.example.com", "under_score.example.com"] {
            let mut config = base_config();
            config.cloudflare.record_names = vec![bad.to_string()];
            assert!(config.validate().is_err(), "expected rejection of {:?}", bad);
        }
    }

    #[test]
    fn zero_sync_count_is_fatal() {
        let mut config = base_config();
        config.sync_count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn yaml_parses_with_defaults_and_passthrough() {
        let yaml = r#"
cloudflare:
  email: ops@example.com
  api_key: secret
  zone_id: zone1
  record_names:
    - fast.example.com
colo: HKG
port: 443
delay: 200
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.sync_count, 1);
        assert_eq!(config.log_file, "cfnat_log.txt");
        assert_eq!(config.program, "cfnat");
        assert_eq!(
            config.discovery.to_args(),
            vec!["-colo=HKG", "-port=443", "-delay=200"]
        );
    }

    #[test]
    fn unset_passthrough_args_render_nothing() {
        assert!(DiscoveryArgs::default().to_args().is_empty());
    }
}
