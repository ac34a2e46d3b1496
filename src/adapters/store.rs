use crate::domain::model::ContactRecord;
use crate::domain::ports::ContactStore;
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredContact {
    phone: String,
    management_company: String,
    address: String,
    updated_at: DateTime<Utc>,
}

/// 以 JSON 檔案保存聯絡資料，email 為主鍵
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    // 序列化同一檔案的讀寫
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<String, StoredContact>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, rows: &BTreeMap<String, StoredContact>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        // 先寫暫存檔再改名，避免寫到一半的檔案
        let tmp_path = self.path.with_extension("json.tmp");
        let data = serde_json::to_vec_pretty(rows)?;
        tokio::fs::write(&tmp_path, data).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

impl ContactStore for JsonFileStore {
    async fn upsert(&self, record: &ContactRecord) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut rows = self.load().await?;

        let replaced = rows
            .insert(
                record.email.clone(),
                StoredContact {
                    phone: record.phone.clone(),
                    management_company: record.management_company.clone(),
                    address: record.address.clone(),
                    updated_at: Utc::now(),
                },
            )
            .is_some();

        self.save(&rows).await?;
        tracing::debug!(
            path = %self.path.display(),
            replaced,
            "💾 Contact record saved"
        );
        Ok(())
    }

    async fn get(&self, email: &str) -> Result<Option<ContactRecord>> {
        let _guard = self.lock.lock().await;
        let rows = self.load().await?;

        Ok(rows.get(email).map(|row| ContactRecord {
            email: email.to_string(),
            phone: row.phone.clone(),
            management_company: row.management_company.clone(),
            address: row.address.clone(),
        }))
    }
}
