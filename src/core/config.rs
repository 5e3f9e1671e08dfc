use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_NBU_BASE_URL: &str = "https://bank.gov.ua";
pub const DEFAULT_CRM_BASE_URL: &str = "https://www.zohoapis.com";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NbuProviderConfig {
    #[serde(default = "default_nbu_base_url")]
    pub base_url: String,
    /// Currency code passed as `valcode`
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Default for NbuProviderConfig {
    fn default() -> Self {
        NbuProviderConfig {
            base_url: default_nbu_base_url(),
            currency: default_currency(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub nbu: NbuProviderConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CrmConfig {
    #[serde(default = "default_crm_base_url")]
    pub base_url: String,
    #[serde(default = "default_entity")]
    pub entity: String,
    #[serde(default = "default_rate_field")]
    pub rate_field: String,
    /// Forwarded verbatim as `Zoho-oauthtoken`; never refreshed here.
    pub access_token: Option<String>,
}

impl Default for CrmConfig {
    fn default() -> Self {
        CrmConfig {
            base_url: default_crm_base_url(),
            entity: default_entity(),
            rate_field: default_rate_field(),
            access_token: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub crm: CrmConfig,
    /// Absolute divergence in percent at which an update is offered
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    pub data_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            providers: ProvidersConfig::default(),
            crm: CrmConfig::default(),
            threshold: default_threshold(),
            data_path: None,
        }
    }
}

fn default_nbu_base_url() -> String {
    DEFAULT_NBU_BASE_URL.to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_crm_base_url() -> String {
    DEFAULT_CRM_BASE_URL.to_string()
}

fn default_entity() -> String {
    "Deals".to_string()
}

fn default_rate_field() -> String {
    "currency_rate".to_string()
}

fn default_threshold() -> f64 {
    5.0
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("ua", "dealrate", "dealrate")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("ua", "dealrate", "dealrate")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            bail!(
                "threshold must be a non-negative number, got {}",
                self.threshold
            );
        }
        Ok(())
    }
}
