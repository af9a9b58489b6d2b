//! Per-source enablement and credentials
//!
//! The configuration document holds one [`IntegrationConfig`] per source plus
//! the usage statistics and the advisory quality snapshots. Credential
//! contents are never validated here; a bad key only shows up when the
//! fetcher uses it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::IntegrationError;
use crate::quality::QualitySnapshot;
use crate::source::{PerSource, SourceKind};
use crate::stats::Statistics;

/// Lifecycle state of an integration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigStatus {
    #[default]
    NotConfigured,
    Configured,
    Disabled,
}

/// Credentials for one supplier feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierCredential {
    pub api_key: String,
    /// Catalog endpoint of this supplier's feed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

/// Source-specific credentials
///
/// Weather and events take a single API key. Suppliers take a map of named
/// credential sets, merged by name on every configure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Credentials {
    ApiKey { api_key: String },
    Suppliers(BTreeMap<String, SupplierCredential>),
}

impl Credentials {
    pub fn api_key(key: impl Into<String>) -> Self {
        Credentials::ApiKey {
            api_key: key.into(),
        }
    }

    /// Single named supplier
    pub fn supplier(name: impl Into<String>, api_key: impl Into<String>, endpoint: Option<String>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(
            name.into(),
            SupplierCredential {
                api_key: api_key.into(),
                endpoint,
            },
        );
        Credentials::Suppliers(map)
    }

    /// True for a blank key or an empty supplier map
    pub fn is_empty(&self) -> bool {
        match self {
            Credentials::ApiKey { api_key } => api_key.trim().is_empty(),
            Credentials::Suppliers(map) => map.is_empty(),
        }
    }

    /// Masked description safe to show in the UI
    pub fn summary(&self) -> String {
        match self {
            Credentials::ApiKey { api_key } => {
                let key = api_key.trim();
                if key.is_empty() {
                    "no API key".to_string()
                } else if key.chars().count() >= 8 {
                    let tail: String = key.chars().skip(key.chars().count() - 4).collect();
                    format!("API key ••••{}", tail)
                } else {
                    "API key ••••".to_string()
                }
            }
            Credentials::Suppliers(map) if map.is_empty() => "no suppliers".to_string(),
            Credentials::Suppliers(map) => {
                let names: Vec<&str> = map.keys().map(String::as_str).collect();
                let noun = if names.len() == 1 { "supplier" } else { "suppliers" };
                format!("{} {}: {}", names.len(), noun, names.join(", "))
            }
        }
    }

    fn check_shape(&self, source: SourceKind) -> Result<(), IntegrationError> {
        match (source, self) {
            (SourceKind::Suppliers, Credentials::Suppliers(_)) => Ok(()),
            (SourceKind::Suppliers, _) => Err(IntegrationError::CredentialShape {
                kind: source,
                expected: "named supplier",
            }),
            (_, Credentials::ApiKey { .. }) => Ok(()),
            (_, _) => Err(IntegrationError::CredentialShape {
                kind: source,
                expected: "API key",
            }),
        }
    }
}

/// Configuration of a single integration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IntegrationConfig {
    pub enabled: bool,
    pub credentials: Option<Credentials>,
    pub status: ConfigStatus,
    pub last_updated: Option<DateTime<Utc>>,
}

impl IntegrationConfig {
    /// The stored credentials, if any are usable for a fetch
    pub fn usable_credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref().filter(|c| !c.is_empty())
    }

    /// Masked credential description
    pub fn credential_summary(&self) -> String {
        self.credentials
            .as_ref()
            .map(Credentials::summary)
            .unwrap_or_else(|| "none".to_string())
    }

    /// Restores `status` to agree with `enabled`
    ///
    /// Documents edited by hand can claim `configured` while disabled.
    fn normalize(&mut self) {
        match (self.enabled, self.status) {
            (false, ConfigStatus::Configured) => self.status = ConfigStatus::Disabled,
            (true, ConfigStatus::NotConfigured | ConfigStatus::Disabled) => {
                self.status = ConfigStatus::Configured
            }
            _ => {}
        }
    }
}

/// Live reachability of a source, as last observed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationStatus {
    pub operational: bool,
    pub message: String,
}

impl Default for IntegrationStatus {
    fn default() -> Self {
        Self {
            operational: false,
            message: "Not configured".to_string(),
        }
    }
}

impl IntegrationStatus {
    pub fn up(message: impl Into<String>) -> Self {
        Self {
            operational: true,
            message: message.into(),
        }
    }

    pub fn down(message: impl Into<String>) -> Self {
        Self {
            operational: false,
            message: message.into(),
        }
    }
}

/// The `integrations.config` document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConfigStore {
    #[serde(flatten)]
    integrations: PerSource<IntegrationConfig>,
    pub statistics: Statistics,
    pub data_quality: PerSource<QualitySnapshot>,
}

impl ConfigStore {
    /// Re-establishes the enabled/status invariant after a load
    pub fn normalized(mut self) -> Self {
        for source in SourceKind::ALL {
            self.integrations.get_mut(source).normalize();
        }
        self
    }

    pub fn get(&self, source: SourceKind) -> &IntegrationConfig {
        self.integrations.get(source)
    }

    /// Applies a configuration change
    ///
    /// `credentials = None` keeps whatever is stored. Supplier credentials are
    /// merged by name, so configuring one supplier leaves the others intact.
    pub fn configure(
        &mut self,
        source: SourceKind,
        credentials: Option<Credentials>,
        enabled: bool,
        now: DateTime<Utc>,
    ) -> Result<IntegrationConfig, IntegrationError> {
        if let Some(creds) = &credentials {
            creds.check_shape(source)?;
        }

        let config = self.integrations.get_mut(source);
        match credentials {
            Some(Credentials::Suppliers(new)) => {
                if let Some(Credentials::Suppliers(existing)) = config.credentials.as_mut() {
                    existing.extend(new);
                } else {
                    config.credentials = Some(Credentials::Suppliers(new));
                }
            }
            Some(creds) => config.credentials = Some(creds),
            None => {}
        }

        config.enabled = enabled;
        config.status = if enabled {
            ConfigStatus::Configured
        } else {
            ConfigStatus::Disabled
        };
        config.last_updated = Some(now);
        Ok(config.clone())
    }

    /// Drops one named supplier from the supplier credentials
    pub fn remove_supplier(
        &mut self,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<IntegrationConfig, IntegrationError> {
        let config = self.integrations.get_mut(SourceKind::Suppliers);
        let removed = match config.credentials.as_mut() {
            Some(Credentials::Suppliers(map)) => map.remove(name).is_some(),
            _ => false,
        };
        if !removed {
            return Err(IntegrationError::UnknownSupplier(name.to_string()));
        }
        config.last_updated = Some(now);
        Ok(config.clone())
    }

    /// Returns one integration to its unconfigured defaults
    pub fn reset_one(&mut self, source: SourceKind) -> IntegrationConfig {
        let config = self.integrations.get_mut(source);
        *config = IntegrationConfig::default();
        config.clone()
    }

    /// Returns every integration to its unconfigured defaults
    pub fn reset_all(&mut self) -> PerSource<IntegrationConfig> {
        for source in SourceKind::ALL {
            self.reset_one(source);
        }
        self.integrations.clone()
    }

    /// Sources currently enabled
    pub fn enabled_sources(&self) -> Vec<SourceKind> {
        SourceKind::ALL
            .into_iter()
            .filter(|s| self.get(*s).enabled)
            .collect()
    }
}
