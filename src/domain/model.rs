use serde::{Deserialize, Serialize};
use std::fmt;

/// 登入入口網站用的帳號密碼，建立後不可變更
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    username: String,
    password: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// 使用者身分欄位（來自 user context 端點）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityFields {
    pub email: String,
    pub phone: String,
}

/// 物業欄位（來自 unit 端點）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyFields {
    pub management_company: String,
    pub address: String,
}

/// 正規化後的聯絡資料，是一次入口網站互動的唯一產出
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub email: String,
    pub phone: String,
    pub management_company: String,
    pub address: String,
}

impl ContactRecord {
    /// 合併兩組互不重疊的欄位
    pub fn from_parts(identity: IdentityFields, property: PropertyFields) -> Self {
        Self {
            email: identity.email,
            phone: identity.phone,
            management_company: property.management_company,
            address: property.address,
        }
    }

    /// 回傳第一個為空的必填欄位名稱
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("email", &self.email),
            ("phone", &self.phone),
            ("management_company", &self.management_company),
            ("address", &self.address),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
    }
}

/// 前端送入的請求：入口網站識別碼與帳密
#[derive(Clone, Deserialize)]
pub struct RetrievalRequest {
    #[serde(alias = "tenant_portal", alias = "portalIdentifier")]
    pub portal: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for RetrievalRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetrievalRequest")
            .field("portal", &self.portal)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}
