use crate::adapters::http::{DEFAULT_TIMEOUT_SECONDS, DEFAULT_USER_AGENT};
use crate::core::registry::{EndpointOverride, PortalContext};
use crate::domain::ports::Connector;
use crate::utils::error::{PortalError, Result};
use crate::utils::validation::{validate_positive_number, validate_url, Validate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub http: Option<HttpConfig>,
    pub store: Option<StoreConfig>,
    #[serde(default)]
    pub portals: HashMap<String, PortalEndpointConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub timeout_seconds: Option<u64>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalEndpointConfig {
    pub base_url: Option<String>,
    pub landing_url: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(PortalError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content)
            .map_err(|e| PortalError::config(format!("TOML parsing error: {}", e)))
    }

    /// 替換環境變數 (例如 ${CLICK_PAY_URL})
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        use std::sync::OnceLock;

        static ENV_VAR: OnceLock<Regex> = OnceLock::new();
        let re = ENV_VAR.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
    }

    pub fn timeout(&self) -> Duration {
        let seconds = self
            .http
            .as_ref()
            .and_then(|h| h.timeout_seconds)
            .unwrap_or(DEFAULT_TIMEOUT_SECONDS);
        Duration::from_secs(seconds)
    }

    pub fn user_agent(&self) -> &str {
        self.http
            .as_ref()
            .and_then(|h| h.user_agent.as_deref())
            .unwrap_or(DEFAULT_USER_AGENT)
    }

    pub fn store_path(&self) -> Option<&str> {
        self.store.as_ref().map(|s| s.path.as_str())
    }

    /// 套用端點覆寫，建立入口網站共用環境
    pub fn portal_context(&self, connector: Arc<dyn Connector>) -> PortalContext {
        self.portals
            .iter()
            .fold(PortalContext::new(connector), |context, (identifier, portal)| {
                context.with_override(
                    identifier,
                    EndpointOverride {
                        base_url: portal.base_url.clone(),
                        landing_url: portal.landing_url.clone(),
                    },
                )
            })
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        if let Some(timeout) = self.http.as_ref().and_then(|h| h.timeout_seconds) {
            validate_positive_number("http.timeout_seconds", timeout, 1)?;
        }

        if let Some(path) = self.store_path() {
            crate::utils::validation::validate_path("store.path", path)?;
        }

        for (identifier, portal) in &self.portals {
            if let Some(url) = &portal.base_url {
                validate_url(&format!("portals.{}.base_url", identifier), url)?;
            }
            if let Some(url) = &portal.landing_url {
                validate_url(&format!("portals.{}.landing_url", identifier), url)?;
            }
        }

        Ok(())
    }
}
