use crate::core::session::PortalSession;
use crate::domain::model::ContactRecord;
use crate::utils::error::Result;
use async_trait::async_trait;

/// 配置與釋放底層網路 session（HTTP client）
pub trait Connector: Send + Sync {
    fn open(&self) -> Result<reqwest::Client>;
    fn release(&self, client: reqwest::Client);
}

/// 一個租金繳費入口網站的完整能力集合
///
/// 具體實作持有自己的 [`PortalSession`]；開啟與關閉有預設實作，
/// 認證與資料擷取則由各入口網站自行定義。
#[async_trait]
pub trait Portal: Send + Sync {
    /// 此實作在 registry 中對應的 key（UpperCamelCase）
    fn implementation(&self) -> &'static str;

    fn session(&self) -> &PortalSession;

    fn session_mut(&mut self) -> &mut PortalSession;

    fn open_session(&mut self) -> Result<()> {
        self.session_mut().open()
    }

    async fn authenticate(&mut self) -> Result<()>;

    async fn fetch_contact(&self) -> Result<ContactRecord>;

    fn close_session(&mut self) {
        self.session_mut().close();
    }
}

impl std::fmt::Debug for dyn Portal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Portal")
            .field("implementation", &self.implementation())
            .finish_non_exhaustive()
    }
}

/// 聯絡資料儲存，以 email 為鍵做 upsert
pub trait ContactStore: Send + Sync {
    fn upsert(
        &self,
        record: &ContactRecord,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    fn get(
        &self,
        email: &str,
    ) -> impl std::future::Future<Output = Result<Option<ContactRecord>>> + Send;
}
