use serde::{Deserialize, Serialize};

use super::cache::CacheConfig;
use super::errors::ConfigError;
use super::logging::LoggingConfig;
use super::resolver::ResolverConfig;
use super::server::ServerConfig;
use super::trust_anchor::TrustAnchorConfig;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    pub server: ServerConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub trust_anchor: TrustAnchorConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn load(path: Option<&str>, overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else if std::path::Path::new("tern-dns.toml").exists() {
            Self::from_file("tern-dns.toml")?
        } else if std::path::Path::new("/etc/tern-dns/config.toml").exists() {
            Self::from_file("/etc/tern-dns/config.toml")?
        } else {
            Self::default()
        };

        config.apply_cli_overrides(overrides);
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(bind) = overrides.bind_address {
            self.server.bind_address = bind;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("listen port cannot be 0".to_string()));
        }
        if !self.server.udp && !self.server.tcp {
            return Err(ConfigError::Validation(
                "at least one of udp/tcp must be enabled".to_string(),
            ));
        }
        if self.resolver.iter_limit == 0 {
            return Err(ConfigError::Validation("resolver.iter_limit must be > 0".to_string()));
        }
        if self.resolver.max_pending == 0 {
            return Err(ConfigError::Validation("resolver.max_pending must be > 0".to_string()));
        }
        Ok(())
    }

    pub fn save(&self, path: &str) -> Result<(), ConfigError> {
        let existing = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        let mut doc = existing
            .parse::<toml_edit::DocumentMut>()
            .map_err(|e| ConfigError::Parse(format!("failed to parse config file: {}", e)))?;

        fn set_val(table: &mut toml_edit::Table, key: &str, new_val: toml_edit::Value) {
            match table.get_mut(key) {
                Some(item @ toml_edit::Item::Value(_)) => {
                    let suffix = item.as_value().and_then(|v| v.decor().suffix()).cloned();
                    *item = toml_edit::Item::Value(new_val);
                    if let (Some(s), Some(v)) = (suffix, item.as_value_mut()) {
                        v.decor_mut().set_suffix(s);
                    }
                }
                Some(item) => *item = toml_edit::Item::Value(new_val),
                None => {
                    table.insert(key, toml_edit::Item::Value(new_val));
                }
            }
        }

        if let Some(t) = doc.get_mut("server").and_then(|i| i.as_table_mut()) {
            set_val(t, "bind_address", toml_edit::Value::from(self.server.bind_address.clone()));
            set_val(t, "port", toml_edit::Value::from(self.server.port as i64));
            set_val(t, "udp", toml_edit::Value::from(self.server.udp));
            set_val(t, "tcp", toml_edit::Value::from(self.server.tcp));
        }

        if let Some(t) = doc.get_mut("cache").and_then(|i| i.as_table_mut()) {
            set_val(t, "max_entries", toml_edit::Value::from(self.cache.max_entries as i64));
        }

        if let Some(t) = doc.get_mut("resolver").and_then(|i| i.as_table_mut()) {
            set_val(t, "iter_limit", toml_edit::Value::from(self.resolver.iter_limit as i64));
            set_val(t, "rtt_max_ms", toml_edit::Value::from(self.resolver.rtt_max_ms as i64));
            set_val(t, "retry_ms", toml_edit::Value::from(self.resolver.retry_ms as i64));
        }

        if let Some(t) = doc.get_mut("logging").and_then(|i| i.as_table_mut()) {
            set_val(t, "level", toml_edit::Value::from(self.logging.level.clone()));
        }

        std::fs::write(path, doc.to_string())
            .map_err(|e| ConfigError::FileWrite(path.to_string(), e.to_string()))?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub port: Option<u16>,
    pub bind_address: Option<String>,
    pub log_level: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_port_fails_validation() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn disabling_both_transports_fails_validation() {
        let mut config = Config::default();
        config.server.udp = false;
        config.server.tcp = false;
        assert!(config.validate().is_err());
    }
}
