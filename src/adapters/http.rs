use crate::domain::ports::Connector;
use crate::utils::error::{PortalError, Result};
use reqwest::Client;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36";

/// 以 reqwest 建立 HTTP client 的預設連線器
#[derive(Debug, Clone)]
pub struct ReqwestConnector {
    timeout: Duration,
    user_agent: String,
}

impl ReqwestConnector {
    pub fn new(timeout: Duration, user_agent: impl Into<String>) -> Self {
        Self {
            timeout,
            user_agent: user_agent.into(),
        }
    }
}

impl Default for ReqwestConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS), DEFAULT_USER_AGENT)
    }
}

impl Connector for ReqwestConnector {
    fn open(&self) -> Result<Client> {
        Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.as_str())
            .build()
            .map_err(|e| PortalError::config(format!("failed to build HTTP client: {}", e)))
    }

    fn release(&self, client: Client) {
        // 丟棄 client 即關閉其連線池
        drop(client);
    }
}

/// 計算開啟與釋放次數的連線器包裝
#[derive(Debug, Default)]
pub struct CountingConnector<C> {
    inner: C,
    opened: AtomicUsize,
    released: AtomicUsize,
}

impl<C: Connector> CountingConnector<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            opened: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

impl<C: Connector> Connector for CountingConnector<C> {
    fn open(&self) -> Result<Client> {
        let client = self.inner.open()?;
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(client)
    }

    fn release(&self, client: Client) {
        self.released.fetch_add(1, Ordering::SeqCst);
        self.inner.release(client);
    }
}
