use crate::core::registry::{PortalContext, PortalRegistry};
use crate::domain::model::{ContactRecord, RetrievalRequest};
use crate::domain::ports::Portal;
use crate::utils::error::{PortalError, Result};
use std::time::Duration;

/// 以範圍化的方式使用入口網站：開啟 → 認證 → 擷取 → 一定關閉
///
/// 若回傳的 future 在途中被丟棄，`portal` 會跟著被丟棄，
/// 其 session 的 `Drop` 仍會釋放底層連線。
pub async fn with_session(mut portal: Box<dyn Portal>) -> Result<ContactRecord> {
    portal.open_session()?;

    let outcome = async {
        portal.authenticate().await?;
        portal.fetch_contact().await
    }
    .await;

    portal.close_session();
    outcome
}

/// 從請求到聯絡資料的完整流程
pub struct ContactRetriever {
    registry: PortalRegistry,
    context: PortalContext,
    timeout: Option<Duration>,
}

impl ContactRetriever {
    pub fn new(registry: PortalRegistry, context: PortalContext) -> Self {
        Self {
            registry,
            context,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn registry(&self) -> &PortalRegistry {
        &self.registry
    }

    pub async fn retrieve(&self, request: &RetrievalRequest) -> Result<ContactRecord> {
        tracing::info!(portal = %request.portal, "🚀 Retrieving contact details");

        let portal = self.registry.create_portal(
            &request.portal,
            &request.username,
            &request.password,
            &self.context,
        )?;

        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, with_session(portal))
                .await
                .unwrap_or_else(|_| {
                    Err(PortalError::transport(
                        request.portal.as_str(),
                        format!("portal interaction timed out after {:?}", limit),
                    ))
                }),
            None => with_session(portal).await,
        };

        match &result {
            Ok(_) => tracing::info!(portal = %request.portal, "✅ Contact details retrieved"),
            Err(e) => tracing::error!(
                portal = %request.portal,
                kind = ?e.kind(),
                "❌ Contact retrieval failed: {}",
                e
            ),
        }
        result
    }
}
