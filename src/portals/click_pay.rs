use crate::core::auth::CookieTokenFlow;
use crate::core::fetch::{fetch_and_merge, post_for_json, success_payload, text_at};
use crate::core::registry::PortalContext;
use crate::core::session::{PortalSession, SessionState};
use crate::domain::model::{ContactRecord, Credential, IdentityFields, PropertyFields};
use crate::domain::ports::{Connector, Portal};
use crate::utils::error::Result;
use crate::utils::validation::{validate_non_empty_string, validate_url};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

pub const IDENTIFIER: &str = "click_pay";
pub const IMPLEMENTATION: &str = "ClickPay";

pub const DEFAULT_BASE_URL: &str = "https://clickpay.com/MobileService/Service.asmx";
pub const DEFAULT_LANDING_URL: &str = "https://clickpay.com/app#PayNow";

const SESSION_COOKIE: &str = "__Secure-SessionId";
const TOKEN_FIELD: &str = "ctl00$antiForgeryToken";
const TOKEN_HEADER: &str = "antiforgerytoken";

const USER_CONTEXT_ENDPOINT: &str = "/getUserContextJSON";
const UNIT_ENDPOINT: &str = "/get_data_allow_impersonation_json";

/// ClickPay 的服務端點
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickPayEndpoints {
    pub base_url: String,
    pub landing_url: String,
}

impl Default for ClickPayEndpoints {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            landing_url: DEFAULT_LANDING_URL.to_string(),
        }
    }
}

impl ClickPayEndpoints {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

fn browser_headers() -> SessionState {
    SessionState::with_headers([
        ("accept", "*/*"),
        ("content-type", "text/plain; charset=UTF-8"),
        ("origin", "https://clickpay.com"),
        ("referer", "https://clickpay.com/"),
        (
            "sec-ch-ua",
            r#""Chromium";v="128", "Not;A=Brand";v="24", "Google Chrome";v="128""#,
        ),
        ("sec-ch-ua-mobile", "?0"),
        ("sec-fetch-mode", "cors"),
        ("sec-fetch-site", "same-origin"),
    ])
}

pub struct ClickPay {
    credential: Credential,
    endpoints: ClickPayEndpoints,
    session: PortalSession,
}

impl ClickPay {
    pub fn new(
        credential: Credential,
        connector: Arc<dyn Connector>,
        endpoints: ClickPayEndpoints,
    ) -> Result<Self> {
        validate_non_empty_string("username", credential.username())?;
        validate_non_empty_string("password", credential.password())?;
        validate_url("click_pay.base_url", &endpoints.base_url)?;
        validate_url("click_pay.landing_url", &endpoints.landing_url)?;

        Ok(Self {
            credential,
            endpoints,
            session: PortalSession::new(IMPLEMENTATION, connector, browser_headers()),
        })
    }

    fn auth_flow(&self) -> CookieTokenFlow {
        CookieTokenFlow {
            prepare_url: self.endpoints.url("/prepare_login"),
            prepare_body: json!({ "prepare": "login" }).to_string(),
            cookie_name: SESSION_COOKIE,
            login_url: self.endpoints.url("/login"),
            landing_url: self.endpoints.landing_url.clone(),
            token_field: TOKEN_FIELD,
            token_header: TOKEN_HEADER,
        }
    }

    fn login_body(&self) -> String {
        json!({
            "username": self.credential.username(),
            "password": self.credential.password(),
            "validateUsername": true,
        })
        .to_string()
    }

    async fn user_context(&self) -> Result<IdentityFields> {
        let url = self.endpoints.url(USER_CONTEXT_ENDPOINT);
        let body = post_for_json(&self.session, &url, "NovelPayApp".to_string()).await?;
        let result = success_payload(&body, USER_CONTEXT_ENDPOINT)?;

        Ok(IdentityFields {
            email: text_at(result, &["user", "Email"], USER_CONTEXT_ENDPOINT)?,
            phone: text_at(result, &["user", "Cellphone"], USER_CONTEXT_ENDPOINT)?,
        })
    }

    async fn unit_details(&self) -> Result<PropertyFields> {
        let url = self.endpoints.url(UNIT_ENDPOINT);
        let payload = json!({
            "RequestType": "get_user_paynow_desktop",
            "FilterByGroupLabel": "1",
            "GroupLabel": "",
        });
        let body = post_for_json(&self.session, &url, payload.to_string()).await?;
        let result = success_payload(&body, UNIT_ENDPOINT)?;

        let field = |name: &str| text_at(result, &["Unit", "Unit", name], UNIT_ENDPOINT);

        let street = [field("StreetNumber")?, field("StreetName")?, field("StreetTypeName")?]
            .iter()
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        Ok(PropertyFields {
            management_company: field("SiteName")?,
            address: format!(
                "{}, {} - {} ({})",
                street,
                field("City")?,
                field("State")?,
                field("Zip")?
            ),
        })
    }
}

#[async_trait]
impl Portal for ClickPay {
    fn implementation(&self) -> &'static str {
        IMPLEMENTATION
    }

    fn session(&self) -> &PortalSession {
        &self.session
    }

    fn session_mut(&mut self) -> &mut PortalSession {
        &mut self.session
    }

    async fn authenticate(&mut self) -> Result<()> {
        let flow = self.auth_flow();
        let login_body = self.login_body();
        flow.run(&mut self.session, login_body).await
    }

    async fn fetch_contact(&self) -> Result<ContactRecord> {
        fetch_and_merge(self.user_context(), self.unit_details()).await
    }
}

/// Registry 使用的工廠
pub fn factory(credential: Credential, context: &PortalContext) -> Result<Box<dyn Portal>> {
    let mut endpoints = ClickPayEndpoints::default();
    if let Some(overrides) = context.endpoints(IMPLEMENTATION) {
        if let Some(base_url) = &overrides.base_url {
            endpoints.base_url = base_url.clone();
        }
        if let Some(landing_url) = &overrides.landing_url {
            endpoints.landing_url = landing_url.clone();
        }
    }

    let portal: Box<dyn Portal> = Box::new(ClickPay::new(credential, context.connector(), endpoints)?);
    Ok(portal)
}

impl std::fmt::Debug for ClickPay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClickPay")
            .field("credential", &self.credential)
            .field("endpoints", &self.endpoints)
            .field("session", &self.session)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::http::ReqwestConnector;
    use crate::core::registry::EndpointOverride;
    use crate::utils::error::ErrorKind;
    use httpmock::prelude::*;

    fn endpoints(server: &MockServer) -> ClickPayEndpoints {
        ClickPayEndpoints {
            base_url: server.url("/MobileService/Service.asmx"),
            landing_url: server.url("/app"),
        }
    }

    fn authenticated_mocks(server: &MockServer) {
        server.mock(|when, then| {
            when.method(POST)
                .path("/MobileService/Service.asmx/prepare_login")
                .body(r#"{"prepare":"login"}"#);
            then.status(200)
                .header("Set-Cookie", "__Secure-SessionId=abc123; Path=/; Secure; HttpOnly");
        });
        server.mock(|when, then| {
            when.method(POST)
                .path("/MobileService/Service.asmx/login")
                .header("cookie", "__Secure-SessionId=abc123")
                .json_body(json!({"username": "user", "password": "pass", "validateUsername": true}));
            then.status(200).json_body(json!({"d": "ok"}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/app");
            then.status(200).body(
                r#"<input type="hidden" name="ctl00$antiForgeryToken" id="aft" value="tok456" />"#,
            );
        });
    }

    #[test]
    fn test_new_rejects_empty_username() {
        let err = ClickPay::new(
            Credential::new("", "pass"),
            Arc::new(ReqwestConnector::default()),
            ClickPayEndpoints::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_factory_applies_endpoint_override() {
        let context = PortalContext::default().with_override(
            "click_pay",
            EndpointOverride {
                base_url: Some("http://127.0.0.1:9/svc".to_string()),
                landing_url: None,
            },
        );
        let portal = factory(Credential::new("user", "pass"), &context).unwrap();
        assert_eq!(portal.implementation(), IMPLEMENTATION);
    }

    #[tokio::test]
    async fn test_address_assembly_skips_empty_street_type() {
        let server = MockServer::start();
        authenticated_mocks(&server);
        server.mock(|when, then| {
            when.method(POST)
                .path("/MobileService/Service.asmx/getUserContextJSON")
                .header("antiforgerytoken", "tok456")
                .body("NovelPayApp");
            then.status(200).json_body(json!({
                "Result": {"user": {"Email": " a@b.com ", "Cellphone": "+1000"}}
            }));
        });
        server.mock(|when, then| {
            when.method(POST)
                .path("/MobileService/Service.asmx/get_data_allow_impersonation_json")
                .header("antiforgerytoken", "tok456");
            then.status(200).json_body(json!({
                "Result": {"Unit": {"Unit": {
                    "SiteName": "Acme Mgmt",
                    "StreetNumber": "7",
                    "StreetName": "Broadway",
                    "StreetTypeName": "",
                    "City": "Town",
                    "State": "ST",
                    "Zip": 12345
                }}}
            }));
        });

        let mut portal = ClickPay::new(
            Credential::new("user", "pass"),
            Arc::new(ReqwestConnector::default()),
            endpoints(&server),
        )
        .unwrap();
        portal.open_session().unwrap();
        portal.authenticate().await.unwrap();
        let record = portal.fetch_contact().await.unwrap();
        portal.close_session();

        assert_eq!(record.email, "a@b.com");
        assert_eq!(record.address, "7 Broadway, Town - ST (12345)");
    }

    #[tokio::test]
    async fn test_fetch_before_authentication_is_rejected() {
        let server = MockServer::start();
        let user_context = server.mock(|when, then| {
            when.method(POST)
                .path("/MobileService/Service.asmx/getUserContextJSON");
            then.status(200).json_body(json!({"Result": {}}));
        });

        let mut portal = ClickPay::new(
            Credential::new("user", "pass"),
            Arc::new(ReqwestConnector::default()),
            endpoints(&server),
        )
        .unwrap();
        portal.open_session().unwrap();
        let err = portal.fetch_contact().await.unwrap_err();
        portal.close_session();

        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert_eq!(user_context.hits(), 0);
    }
}
