use crate::core::session::{AuthState, PortalSession};
use crate::utils::error::{PortalError, Result};
use regex::Regex;
use reqwest::{Method, RequestBuilder, Response};
use std::sync::OnceLock;

/// 送出請求；網路錯誤或非 2xx 狀態一律視為 TransportError
pub async fn send(builder: RequestBuilder, url: &str) -> Result<Response> {
    let response = builder
        .send()
        .await
        .map_err(|e| PortalError::transport(url, e))?;
    ensure_success(response, url)
}

pub fn ensure_success(response: Response, url: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(PortalError::transport(url, format!("HTTP {}", status)))
    }
}

/// 從回應的 Set-Cookie 中取出指定名稱的 cookie 值
pub fn find_cookie(response: &Response, name: &str) -> Option<String> {
    response
        .cookies()
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

fn input_tag_pattern() -> &'static Regex {
    static INPUT: OnceLock<Regex> = OnceLock::new();
    INPUT.get_or_init(|| Regex::new(r"(?is)<input\b[^>]*>").expect("input pattern is valid"))
}

fn attribute_pattern() -> &'static Regex {
    static ATTR: OnceLock<Regex> = OnceLock::new();
    ATTR.get_or_init(|| {
        Regex::new(r#"(?s)([A-Za-z_:][-A-Za-z0-9_:.$]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
            .expect("attribute pattern is valid")
    })
}

/// 在頁面標記中找出指定 name 的 `<input>`，回傳其 value（空值視為不存在）
pub fn extract_input_value(markup: &str, field_name: &str) -> Option<String> {
    input_tag_pattern().find_iter(markup).find_map(|tag| {
        let mut name = None;
        let mut value = None;
        for caps in attribute_pattern().captures_iter(tag.as_str()) {
            let attr = caps[1].to_ascii_lowercase();
            let attr_value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str())
                .unwrap_or_default();
            match attr.as_str() {
                "name" => name = Some(attr_value),
                "value" => value = Some(attr_value),
                _ => {}
            }
        }
        if name == Some(field_name) {
            value.map(|v| decode_entities(v).trim().to_string())
        } else {
            None
        }
    })
    .filter(|value| !value.is_empty())
}

/// 還原屬性值中常見的 HTML 實體；`&amp;` 最後處理以免重複解碼
fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Cookie 與 anti-forgery token 型的登入流程描述
///
/// 1. POST `prepare_url` 取得名為 `cookie_name` 的 session cookie，寫入 `Cookie` 標頭
/// 2. 帶著 cookie POST 帳密到 `login_url`
/// 3. GET `landing_url`，從頁面的隱藏欄位 `token_field` 取出 token，寫入 `token_header`
#[derive(Debug, Clone)]
pub struct CookieTokenFlow {
    pub prepare_url: String,
    pub prepare_body: String,
    pub cookie_name: &'static str,
    pub login_url: String,
    pub landing_url: String,
    pub token_field: &'static str,
    pub token_header: &'static str,
}

pub const COOKIE_HEADER: &str = "Cookie";

impl CookieTokenFlow {
    pub async fn run(&self, session: &mut PortalSession, login_body: String) -> Result<()> {
        let result = self.run_steps(session, login_body).await;
        result.map_err(|e| session.fail(e))
    }

    async fn run_steps(&self, session: &mut PortalSession, login_body: String) -> Result<()> {
        // 終止狀態不可重跑流程，也不可再對入口網站發出任何請求
        if session.auth_state() != AuthState::Unauthenticated {
            return Err(PortalError::SessionEstablishment {
                portal: session.portal().to_string(),
                reason: format!(
                    "cannot start authentication while session is {}",
                    session.auth_state()
                ),
            });
        }
        self.acquire_cookie(session).await?;
        self.acquire_token(session, login_body).await
    }

    async fn acquire_cookie(&self, session: &mut PortalSession) -> Result<()> {
        tracing::debug!(portal = session.portal(), url = %self.prepare_url, "🍪 Requesting session cookie");
        let request = session
            .request(Method::POST, &self.prepare_url)?
            .body(self.prepare_body.clone());
        let response = send(request, &self.prepare_url).await?;

        let cookie = find_cookie(&response, self.cookie_name).ok_or_else(|| {
            PortalError::SessionEstablishment {
                portal: session.portal().to_string(),
                reason: format!("cookie '{}' not found in response", self.cookie_name),
            }
        })?;

        let header_value = format!("{}={}", self.cookie_name, cookie);
        session.record_session_cookie(COOKIE_HEADER, header_value, cookie)
    }

    async fn acquire_token(&self, session: &mut PortalSession, login_body: String) -> Result<()> {
        tracing::debug!(portal = session.portal(), url = %self.login_url, "🔑 Submitting credentials");
        let request = session.request(Method::POST, &self.login_url)?.body(login_body);
        let response = request
            .send()
            .await
            .map_err(|e| PortalError::transport(&self.login_url, e))?;

        let status = response.status();
        if status.is_client_error() {
            return Err(PortalError::Authentication {
                portal: session.portal().to_string(),
                reason: format!("login returned HTTP {}", status),
            });
        }
        ensure_success(response, &self.login_url)?;

        tracing::debug!(portal = session.portal(), url = %self.landing_url, "📄 Loading post-login page");
        let request = session.request(Method::GET, &self.landing_url)?;
        let markup = send(request, &self.landing_url)
            .await?
            .text()
            .await
            .map_err(|e| PortalError::transport(&self.landing_url, e))?;

        let token = extract_input_value(&markup, self.token_field).ok_or_else(|| {
            PortalError::TokenExtraction {
                portal: session.portal().to_string(),
                field: self.token_field.to_string(),
                reason: "is missing or empty".to_string(),
            }
        })?;

        session.record_anti_forgery_token(self.token_header, token)?;
        tracing::info!(portal = session.portal(), "✅ Portal session authenticated");
        Ok(())
    }
}
