use crate::adapters::http::ReqwestConnector;
use crate::core::session::AuthState;
use crate::domain::model::Credential;
use crate::domain::ports::{Connector, Portal};
use crate::portals;
use crate::utils::error::{PortalError, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// 單一入口網站的端點覆寫設定
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointOverride {
    pub base_url: Option<String>,
    pub landing_url: Option<String>,
}

/// 建立入口網站時共用的環境：連線器與端點覆寫
#[derive(Clone)]
pub struct PortalContext {
    connector: Arc<dyn Connector>,
    overrides: HashMap<String, EndpointOverride>,
}

impl PortalContext {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            overrides: HashMap::new(),
        }
    }

    /// 覆寫設定以正規化後的 lookup key 儲存
    pub fn with_override(mut self, identifier: &str, endpoints: EndpointOverride) -> Self {
        self.overrides.insert(lookup_key(identifier), endpoints);
        self
    }

    pub fn connector(&self) -> Arc<dyn Connector> {
        Arc::clone(&self.connector)
    }

    pub fn endpoints(&self, key: &str) -> Option<&EndpointOverride> {
        self.overrides.get(key)
    }
}

impl Default for PortalContext {
    fn default() -> Self {
        Self::new(Arc::new(ReqwestConnector::default()))
    }
}

pub type PortalFactory =
    Arc<dyn Fn(Credential, &PortalContext) -> Result<Box<dyn Portal>> + Send + Sync>;

/// 識別碼轉成 lookup key：`click_pay`、`clickPay` 與 `CLICK_PAY` 都對應 `ClickPay`
///
/// 全大寫的片段其餘字母轉小寫；混合大小寫的片段保留原樣，以維持 camelCase 的分詞。
pub fn lookup_key(identifier: &str) -> String {
    identifier
        .trim()
        .split(['_', '-'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let all_caps = !part.chars().any(char::is_lowercase);
            let mut chars = part.chars();
            match chars.next() {
                Some(first) if all_caps => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// 入口網站識別碼到實作工廠的對照表
///
/// 新增入口網站只需 [`PortalRegistry::register`]，呼叫端不需修改。
#[derive(Clone, Default)]
pub struct PortalRegistry {
    factories: BTreeMap<String, PortalFactory>,
}

impl PortalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 內建的所有入口網站
    pub fn with_builtin_portals() -> Self {
        let mut registry = Self::new();
        registry.register(portals::click_pay::IDENTIFIER, portals::click_pay::factory);
        registry
    }

    pub fn register<F>(&mut self, identifier: &str, factory: F) -> &mut Self
    where
        F: Fn(Credential, &PortalContext) -> Result<Box<dyn Portal>> + Send + Sync + 'static,
    {
        let key = lookup_key(identifier);
        if self.factories.insert(key.clone(), Arc::new(factory)).is_some() {
            tracing::warn!(identifier, key = %key, "Replacing existing portal registration");
        }
        self
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// 依識別碼建立新的入口網站實例（不做快取，每個請求一個）
    pub fn create_portal(
        &self,
        identifier: &str,
        username: &str,
        password: &str,
        context: &PortalContext,
    ) -> Result<Box<dyn Portal>> {
        let key = lookup_key(identifier);
        let factory = self
            .factories
            .get(&key)
            .ok_or_else(|| PortalError::UnknownPortal {
                identifier: identifier.to_string(),
                key: key.clone(),
            })?;

        let portal = factory(Credential::new(username, password), context).map_err(|e| {
            PortalError::PortalCreation {
                identifier: identifier.to_string(),
                source: Box::new(e),
            }
        })?;

        check_fresh(identifier, portal.as_ref())?;
        tracing::debug!(identifier, implementation = portal.implementation(), "Portal created");
        Ok(portal)
    }
}

/// 工廠必須交出尚未開啟、尚未認證的新實例
fn check_fresh(identifier: &str, portal: &dyn Portal) -> Result<()> {
    let session = portal.session();
    let reason = if session.has_been_opened() {
        Some("factory returned a portal whose session was already opened".to_string())
    } else if session.auth_state() != AuthState::Unauthenticated {
        Some(format!(
            "factory returned a portal in state '{}'",
            session.auth_state()
        ))
    } else {
        None
    };

    match reason {
        Some(reason) => Err(PortalError::InvalidPortalImplementation {
            identifier: identifier.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

impl std::fmt::Debug for PortalRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalRegistry")
            .field("portals", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
