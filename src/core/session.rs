use crate::domain::ports::Connector;
use crate::utils::error::{PortalError, Result};
use reqwest::{Client, Method, RequestBuilder};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// 認證狀態機：Unauthenticated → CookieAcquired → Authenticated，任何步驟失敗進入 Failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    CookieAcquired,
    Authenticated,
    Failed,
}

impl AuthState {
    pub fn is_terminal(self) -> bool {
        matches!(self, AuthState::Authenticated | AuthState::Failed)
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthState::Unauthenticated => "unauthenticated",
            AuthState::CookieAcquired => "cookie-acquired",
            AuthState::Authenticated => "authenticated",
            AuthState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// 協定狀態：隨認證流程累積的標頭與秘密值
#[derive(Clone, Default)]
pub struct SessionState {
    headers: BTreeMap<String, String>,
    session_cookie: Option<String>,
    anti_forgery_token: Option<String>,
}

impl SessionState {
    pub fn with_headers<I, K, V>(headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn session_cookie(&self) -> Option<&str> {
        self.session_cookie.as_deref()
    }

    pub fn anti_forgery_token(&self) -> Option<&str> {
        self.anti_forgery_token.as_deref()
    }
}

// 秘密值不可出現在日誌中
impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("session_cookie", &self.session_cookie.as_ref().map(|_| "***"))
            .field(
                "anti_forgery_token",
                &self.anti_forgery_token.as_ref().map(|_| "***"),
            )
            .finish()
    }
}

/// 擁有底層網路 session 與認證標頭狀態
///
/// 狀態只能透過 `&mut self` 的認證步驟修改；資料擷取只拿得到 `&PortalSession`。
/// 若 session 在未呼叫 [`PortalSession::close`] 的情況下被丟棄（例如外層 future
/// 被取消），`Drop` 會負責釋放。
pub struct PortalSession {
    portal: &'static str,
    connector: Arc<dyn Connector>,
    client: Option<Client>,
    state: SessionState,
    auth: AuthState,
    used: bool,
}

impl PortalSession {
    pub fn new(portal: &'static str, connector: Arc<dyn Connector>, state: SessionState) -> Self {
        Self {
            portal,
            connector,
            client: None,
            state,
            auth: AuthState::Unauthenticated,
            used: false,
        }
    }

    pub fn portal(&self) -> &'static str {
        self.portal
    }

    /// 配置底層網路 session；每個 session 只能開啟一次
    pub fn open(&mut self) -> Result<()> {
        if self.used {
            return Err(self.establishment_error("session has already been used"));
        }
        let client = self.connector.open()?;
        self.client = Some(client);
        self.used = true;
        tracing::debug!(portal = self.portal, "🔌 Portal session opened");
        Ok(())
    }

    /// 釋放底層網路 session；重複呼叫不會重複釋放
    pub fn close(&mut self) {
        if let Some(client) = self.client.take() {
            self.connector.release(client);
            tracing::debug!(portal = self.portal, auth = %self.auth, "🔌 Portal session closed");
        }
    }

    pub fn is_open(&self) -> bool {
        self.client.is_some()
    }

    pub fn has_been_opened(&self) -> bool {
        self.used
    }

    pub fn auth_state(&self) -> AuthState {
        self.auth
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn client(&self) -> Result<&Client> {
        self.client
            .as_ref()
            .ok_or_else(|| self.establishment_error("session is not open"))
    }

    /// 建立帶有目前協定標頭的請求
    pub fn request(&self, method: Method, url: &str) -> Result<RequestBuilder> {
        let mut builder = self.client()?.request(method, url);
        for (name, value) in &self.state.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        Ok(builder)
    }

    /// Unauthenticated → CookieAcquired
    pub fn record_session_cookie(
        &mut self,
        header_name: &str,
        header_value: String,
        cookie: String,
    ) -> Result<()> {
        self.client()?;
        self.expect_state(AuthState::Unauthenticated, "record the session cookie")?;
        self.state.headers.insert(header_name.to_string(), header_value);
        self.state.session_cookie = Some(cookie);
        self.transition(AuthState::CookieAcquired);
        Ok(())
    }

    /// CookieAcquired → Authenticated
    pub fn record_anti_forgery_token(&mut self, header_name: &str, token: String) -> Result<()> {
        self.client()?;
        self.expect_state(AuthState::CookieAcquired, "record the anti-forgery token")?;
        self.state
            .headers
            .insert(header_name.to_string(), token.clone());
        self.state.anti_forgery_token = Some(token);
        self.transition(AuthState::Authenticated);
        Ok(())
    }

    /// 將狀態標記為 Failed 並原樣回傳錯誤，方便搭配 `map_err`
    pub fn fail(&mut self, err: PortalError) -> PortalError {
        if !self.auth.is_terminal() {
            self.transition(AuthState::Failed);
        }
        tracing::warn!(portal = self.portal, error = %err, "Authentication flow failed");
        err
    }

    pub fn require_authenticated(&self) -> Result<()> {
        self.client()?;
        if self.auth != AuthState::Authenticated {
            return Err(PortalError::Authentication {
                portal: self.portal.to_string(),
                reason: format!("session is {}, not authenticated", self.auth),
            });
        }
        Ok(())
    }

    fn expect_state(&self, expected: AuthState, action: &str) -> Result<()> {
        if self.auth != expected {
            return Err(self.establishment_error(&format!(
                "cannot {} while session is {}",
                action, self.auth
            )));
        }
        Ok(())
    }

    fn transition(&mut self, next: AuthState) {
        tracing::debug!(portal = self.portal, from = %self.auth, to = %next, "Auth state transition");
        self.auth = next;
    }

    fn establishment_error(&self, reason: &str) -> PortalError {
        PortalError::SessionEstablishment {
            portal: self.portal.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl Drop for PortalSession {
    fn drop(&mut self) {
        if self.client.is_some() {
            tracing::warn!(portal = self.portal, "Portal session dropped while open, releasing");
            self.close();
        }
    }
}

impl fmt::Debug for PortalSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortalSession")
            .field("portal", &self.portal)
            .field("open", &self.is_open())
            .field("auth", &self.auth)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::http::{CountingConnector, ReqwestConnector};
    use crate::utils::error::ErrorKind;

    fn counting() -> Arc<CountingConnector<ReqwestConnector>> {
        Arc::new(CountingConnector::new(ReqwestConnector::default()))
    }

    fn session(connector: Arc<CountingConnector<ReqwestConnector>>) -> PortalSession {
        PortalSession::new(
            "TestPortal",
            connector,
            SessionState::with_headers([("accept", "*/*")]),
        )
    }

    #[test]
    fn test_open_close_releases_once() {
        let connector = counting();
        let mut session = session(connector.clone());

        session.open().unwrap();
        assert!(session.is_open());
        session.close();
        session.close();

        assert!(!session.is_open());
        assert_eq!(connector.opened(), 1);
        assert_eq!(connector.released(), 1);
    }

    #[test]
    fn test_session_cannot_be_reopened() {
        let connector = counting();
        let mut session = session(connector.clone());

        session.open().unwrap();
        session.close();
        let err = session.open().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SessionEstablishment);
        assert_eq!(connector.opened(), 1);
    }

    #[test]
    fn test_drop_releases_open_session() {
        let connector = counting();
        {
            let mut session = session(connector.clone());
            session.open().unwrap();
        }
        assert_eq!(connector.released(), 1);
    }

    #[test]
    fn test_token_requires_cookie_first() {
        let mut session = session(counting());
        session.open().unwrap();

        let err = session
            .record_anti_forgery_token("antiforgerytoken", "tok".to_string())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SessionEstablishment);
        assert_eq!(session.auth_state(), AuthState::Unauthenticated);
        assert!(session.state().anti_forgery_token().is_none());
    }

    #[test]
    fn test_full_transition_sequence() {
        let mut session = session(counting());
        session.open().unwrap();

        session
            .record_session_cookie("Cookie", "sid=abc".to_string(), "abc".to_string())
            .unwrap();
        assert_eq!(session.auth_state(), AuthState::CookieAcquired);
        assert_eq!(session.state().header("Cookie"), Some("sid=abc"));

        session
            .record_anti_forgery_token("antiforgerytoken", "tok".to_string())
            .unwrap();
        assert_eq!(session.auth_state(), AuthState::Authenticated);
        assert!(session.require_authenticated().is_ok());

        // 終止狀態不再轉移
        let _ = session.fail(PortalError::config("late failure"));
        assert_eq!(session.auth_state(), AuthState::Authenticated);
        assert!(session
            .record_session_cookie("Cookie", "sid=x".to_string(), "x".to_string())
            .is_err());
    }

    #[test]
    fn test_failed_state_is_final() {
        let mut session = session(counting());
        session.open().unwrap();

        let _ = session.fail(PortalError::config("boom"));
        assert_eq!(session.auth_state(), AuthState::Failed);
        assert!(session
            .record_session_cookie("Cookie", "sid=abc".to_string(), "abc".to_string())
            .is_err());
        assert!(session.require_authenticated().is_err());
    }

    #[test]
    fn test_closed_session_rejects_requests() {
        let session = session(counting());
        let err = session.request(Method::GET, "http://localhost/").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SessionEstablishment);
    }

    #[test]
    fn test_debug_hides_secrets() {
        let mut session = session(counting());
        session.open().unwrap();
        session
            .record_session_cookie("Cookie", "sid=abc123".to_string(), "abc123".to_string())
            .unwrap();
        assert!(!format!("{:?}", session).contains("abc123"));
    }
}
