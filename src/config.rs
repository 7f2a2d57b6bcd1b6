//! Responder Configuration
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! command-line flags or `GDD_*` environment variables. The result is
//! finalized once at startup and shared read-only afterwards.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;

use tracing::warn;

use crate::dns::name;
use crate::dns::record::{Record, RecordType};
use crate::protocol::is_token;

/// Main configuration for the responder
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DdnsConfig {
    // === Zone ===

    /// Domain the responder is authoritative for, stored with one trailing dot
    pub base_domain: String,

    /// Preformatted NS records; synthesized from the base domain when empty
    pub ns_records: Vec<String>,

    /// Preformatted SOA record; synthesized from the base domain when unset
    pub soa_record: Option<String>,

    // === Network ===

    /// Address for the UDP listener
    pub listen_addr: IpAddr,

    /// Port for the UDP listener
    pub listen_port: u16,

    // === Security ===

    /// Shared secret every set/get query must carry
    pub token: String,

    // === Reporting ===

    /// Interval between status log lines (seconds)
    pub status_interval_secs: u64,
}

impl Default for DdnsConfig {
    fn default() -> Self {
        Self {
            base_domain: "example.com.".to_string(),
            ns_records: vec![],
            soa_record: None,

            listen_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            listen_port: 5353, // Use 53 in production with proper permissions

            token: "mytoken".to_string(),

            status_interval_secs: 60,
        }
    }
}

impl DdnsConfig {
    /// Load configuration from TOML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    // Builder-style methods for CLI/environment overrides. Blank values
    // leave the current setting alone.

    pub fn with_base_domain(mut self, domain: Option<String>) -> Self {
        if let Some(domain) = non_blank(domain) {
            self.base_domain = domain;
        }
        self
    }

    pub fn with_listen_addr(mut self, addr: Option<IpAddr>) -> Self {
        if let Some(addr) = addr {
            self.listen_addr = addr;
        }
        self
    }

    /// Override the port from text; a value that is not a port is an error
    pub fn with_listen_port(mut self, port: Option<String>) -> anyhow::Result<Self> {
        if let Some(port) = non_blank(port) {
            self.listen_port = port
                .parse::<u16>()
                .map_err(|e| anyhow::anyhow!("Failed to parse listen port {:?}: {}", port, e))?;
        }
        Ok(self)
    }

    /// Override the NS records from a `;`-separated list
    pub fn with_ns_records(mut self, records: Option<String>) -> Self {
        if let Some(records) = non_blank(records) {
            self.ns_records = records
                .split(';')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(String::from)
                .collect();
        }
        self
    }

    pub fn with_soa_record(mut self, record: Option<String>) -> Self {
        if let Some(record) = non_blank(record) {
            self.soa_record = Some(record);
        }
        self
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        if let Some(token) = non_blank(token) {
            self.token = token;
        }
        self
    }

    pub fn with_status_interval(mut self, secs: Option<u64>) -> Self {
        if let Some(secs) = secs {
            self.status_interval_secs = secs;
        }
        self
    }

    /// Normalize the base domain and synthesize the NS/SOA records left unset
    pub fn finalize(mut self) -> Self {
        self.base_domain = normalize_base_domain(&self.base_domain);
        self.token = self.token.trim().to_string();

        let base = self.base_domain.clone();
        if self.ns_records.is_empty() {
            self.ns_records = vec![
                format!("{0} 30 IN NS dns1.{0}", base),
                format!("{0} 30 IN NS dns2.{0}", base),
            ];
        }
        if self.soa_record.as_deref().map_or(true, |s| s.trim().is_empty()) {
            self.soa_record = Some(format!(
                "{0} 3600 IN SOA dns1.{0} webadmin.{0} 2020000001 300 300 2592000 7200",
                base
            ));
        }
        self
    }

    /// The SOA record text, empty before `finalize`
    pub fn soa_record(&self) -> &str {
        self.soa_record.as_deref().unwrap_or_default()
    }

    /// Validate configuration values
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.base_domain.is_empty() || self.base_domain == "." {
            anyhow::bail!("base_domain must name a zone below the root");
        }
        name::validate(&self.base_domain)
            .map_err(|e| anyhow::anyhow!("invalid base_domain: {}", e))?;

        if !is_token(&self.token) {
            anyhow::bail!(
                "token must be non-empty and contain only letters, digits and underscores"
            );
        }

        if self.status_interval_secs == 0 {
            anyhow::bail!("status_interval_secs must be greater than zero");
        }

        Ok(())
    }

    /// Warn about configured NS/SOA text that is unparseable or of the wrong
    /// type, returning how many records were flagged.
    ///
    /// Unparseable records are left out of replies; they never stop the responder.
    pub fn check_static_records(&self) -> usize {
        let mut bad = 0;
        let records = self
            .ns_records
            .iter()
            .map(|text| (text.as_str(), RecordType::NS))
            .chain(std::iter::once((self.soa_record(), RecordType::SOA)));

        for (text, expected) in records {
            match text.parse::<Record>() {
                Ok(record) if record.rtype == expected => {}
                Ok(record) => {
                    warn!(
                        "Configured {} record {:?} has type {}",
                        expected, text, record.rtype
                    );
                    bad += 1;
                }
                Err(e) => {
                    warn!(
                        "Configured {} record {:?} is invalid and will be skipped: {}",
                        expected, text, e
                    );
                    bad += 1;
                }
            }
        }
        bad
    }
}

/// Drop one leading dot and end with exactly one trailing dot.
///
/// Returns an empty string when nothing but dots is left.
pub fn normalize_base_domain(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('.').unwrap_or(trimmed);
    let trimmed = trimmed.trim_end_matches('.');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}.", trimmed)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = DdnsConfig::default().finalize();
        assert_eq!(config.base_domain, "example.com.");
        assert_eq!(config.listen_port, 5353);
        assert_eq!(config.token, "mytoken");
        assert_eq!(
            config.ns_records,
            vec![
                "example.com. 30 IN NS dns1.example.com.".to_string(),
                "example.com. 30 IN NS dns2.example.com.".to_string(),
            ]
        );
        assert_eq!(
            config.soa_record(),
            "example.com. 3600 IN SOA dns1.example.com. webadmin.example.com. 2020000001 300 300 2592000 7200"
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_normalize_base_domain() {
        assert_eq!(normalize_base_domain("example.com"), "example.com.");
        assert_eq!(normalize_base_domain(".example.com"), "example.com.");
        assert_eq!(normalize_base_domain(" example.com.. "), "example.com.");
        assert_eq!(normalize_base_domain("."), "");
        assert_eq!(normalize_base_domain(""), "");
    }

    #[test]
    fn test_defaults_follow_overridden_base_domain() {
        let config = DdnsConfig::default()
            .with_base_domain(Some("ddns.example.org".to_string()))
            .finalize();
        assert_eq!(config.base_domain, "ddns.example.org.");
        assert_eq!(config.ns_records[1], "ddns.example.org. 30 IN NS dns2.ddns.example.org.");
        assert!(config.soa_record().starts_with("ddns.example.org. 3600 IN SOA"));
    }

    #[test]
    fn test_builder_methods() {
        let config = DdnsConfig::default()
            .with_listen_port(Some(" 5354 ".to_string()))
            .unwrap()
            .with_token(Some("  abc123 ".to_string()))
            .with_ns_records(Some(
                "example.com. 60 IN NS a.example.net.; example.com. 60 IN NS b.example.net.;".to_string(),
            ))
            .with_soa_record(Some("   ".to_string()))
            .with_status_interval(Some(5))
            .finalize();

        assert_eq!(config.listen_port, 5354);
        assert_eq!(config.token, "abc123");
        assert_eq!(config.ns_records.len(), 2);
        assert_eq!(config.ns_records[1], "example.com. 60 IN NS b.example.net.");
        assert!(config.soa_record().contains("webadmin.example.com."));
        assert_eq!(config.status_interval_secs, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_blank_overrides_keep_defaults() {
        let config = DdnsConfig::default()
            .with_base_domain(Some("".to_string()))
            .with_token(Some(" ".to_string()))
            .with_listen_port(Some("".to_string()))
            .unwrap()
            .finalize();
        assert_eq!(config.base_domain, "example.com.");
        assert_eq!(config.token, "mytoken");
        assert_eq!(config.listen_port, 5353);
    }

    #[test]
    fn test_unparseable_port_is_an_error() {
        assert!(DdnsConfig::default()
            .with_listen_port(Some("53a".to_string()))
            .is_err());
        assert!(DdnsConfig::default()
            .with_listen_port(Some("70000".to_string()))
            .is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = DdnsConfig::default().finalize();
        assert!(config.validate().is_ok());

        config.token = "bad-token".to_string();
        assert!(config.validate().is_err());

        let mut config = DdnsConfig::default()
            .with_base_domain(Some(".".to_string()))
            .finalize();
        assert!(config.validate().is_err());

        config = DdnsConfig::default().finalize();
        config.status_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_static_records_do_not_fail_validation() {
        let config = DdnsConfig::default()
            .with_ns_records(Some("example.com. 30 IN NS dns1.example.com.;broken".to_string()))
            .with_soa_record(Some("example.com. 30 IN NS dns1.example.com.".to_string()))
            .finalize();
        assert!(config.validate().is_ok());
        assert_eq!(config.check_static_records(), 2);

        assert_eq!(DdnsConfig::default().finalize().check_static_records(), 0);
    }

    #[test]
    fn test_load_partial_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "base_domain = \"ddns.test\"\ntoken = \"filetoken\"\nlisten_port = 8053"
        )
        .unwrap();

        let config = DdnsConfig::load(file.path()).unwrap().finalize();
        assert_eq!(config.base_domain, "ddns.test.");
        assert_eq!(config.token, "filetoken");
        assert_eq!(config.listen_port, 8053);
        assert_eq!(config.status_interval_secs, 60);
        assert!(config.validate().is_ok());
    }
}
