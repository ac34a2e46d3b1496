use crate::core::auth::send;
use crate::core::session::PortalSession;
use crate::domain::model::{ContactRecord, IdentityFields, PropertyFields};
use crate::utils::error::{PortalError, Result};
use reqwest::Method;
use serde_json::Value;
use std::future::Future;

/// 回應中代表成功的頂層欄位
pub const SUCCESS_MARKER: &str = "Result";

/// 同時執行身分與物業兩個子請求，兩者都成功才合併成一筆聯絡資料
///
/// 兩個子請求都失敗時，兩個錯誤都會保留在 [`PortalError::FetchFailures`] 中。
pub async fn fetch_and_merge<I, P>(identity: I, property: P) -> Result<ContactRecord>
where
    I: Future<Output = Result<IdentityFields>>,
    P: Future<Output = Result<PropertyFields>>,
{
    let (identity, property) = tokio::join!(identity, property);

    let record = match (identity, property) {
        (Ok(identity), Ok(property)) => ContactRecord::from_parts(identity, property),
        (Err(err), Ok(_)) | (Ok(_), Err(err)) => return Err(err),
        (Err(first), Err(second)) => {
            return Err(PortalError::FetchFailures {
                first: Box::new(first),
                second: Box::new(second),
            })
        }
    };

    let record = normalize(record)?;
    tracing::info!("📦 Contact record assembled");
    Ok(record)
}

/// 去除前後空白並確認所有欄位皆非空
pub fn normalize(record: ContactRecord) -> Result<ContactRecord> {
    let record = ContactRecord {
        email: record.email.trim().to_string(),
        phone: record.phone.trim().to_string(),
        management_company: record.management_company.trim().to_string(),
        address: record.address.trim().to_string(),
    };

    match record.missing_field() {
        Some(field) => Err(PortalError::data_unavailable(
            "contact record",
            format!("field '{}' is empty", field),
        )),
        None => Ok(record),
    }
}

/// 以已認證的 session 送出 POST，回傳 JSON 內容
pub async fn post_for_json(session: &PortalSession, url: &str, body: String) -> Result<Value> {
    session.require_authenticated()?;
    tracing::debug!(portal = session.portal(), url, "📡 Fetching portal data");

    let request = session.request(Method::POST, url)?.body(body);
    let text = send(request, url)
        .await?
        .text()
        .await
        .map_err(|e| PortalError::transport(url, e))?;

    // 登入失效時入口網站常回傳 HTML 頁面而非 JSON
    serde_json::from_str(&text)
        .map_err(|e| PortalError::data_unavailable(url, format!("response is not JSON ({})", e)))
}

/// 取出頂層成功欄位；缺少時代表資料無法取得
pub fn success_payload<'a>(body: &'a Value, endpoint: &str) -> Result<&'a Value> {
    match body.get(SUCCESS_MARKER) {
        Some(result) if !result.is_null() => Ok(result),
        _ => Err(PortalError::data_unavailable(
            endpoint,
            format!("response has no '{}' field", SUCCESS_MARKER),
        )),
    }
}

/// 依路徑取出巢狀欄位的文字值（數字也接受）
pub fn text_at(value: &Value, path: &[&str], endpoint: &str) -> Result<String> {
    let found = path.iter().try_fold(value, |current, key| current.get(*key));

    match found {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(PortalError::data_unavailable(
            endpoint,
            format!("field '{}' is missing", path.join(".")),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::ErrorKind;
    use serde_json::json;
    use std::time::Duration;

    fn identity() -> IdentityFields {
        IdentityFields {
            email: "a@b.com".to_string(),
            phone: "+1000".to_string(),
        }
    }

    fn property() -> PropertyFields {
        PropertyFields {
            management_company: "Acme Mgmt".to_string(),
            address: "12 Main St, Town - ST (00000)".to_string(),
        }
    }

    #[tokio::test]
    async fn test_merge_independent_of_completion_order() {
        let identity_first = fetch_and_merge(async { Ok::<_, PortalError>(identity()) }, async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok::<_, PortalError>(property())
        })
        .await
        .unwrap();

        let property_first = fetch_and_merge(
            async {
                tokio::time::sleep(Duration::from_millis(30)).await;
                Ok::<_, PortalError>(identity())
            },
            async { Ok::<_, PortalError>(property()) },
        )
        .await
        .unwrap();

        assert_eq!(identity_first, property_first);
        assert_eq!(identity_first, ContactRecord::from_parts(identity(), property()));
    }

    #[tokio::test]
    async fn test_single_failure_fails_whole_fetch() {
        let err = fetch_and_merge(
            async { Ok::<_, PortalError>(identity()) },
            async { Err::<PropertyFields, _>(PortalError::data_unavailable("/unit", "no Result")) },
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DataUnavailable);
        assert_eq!(err.failures().len(), 1);
    }

    #[tokio::test]
    async fn test_both_failures_are_surfaced() {
        let err = fetch_and_merge(
            async { Err::<IdentityFields, _>(PortalError::data_unavailable("/user", "no Result")) },
            async { Err::<PropertyFields, _>(PortalError::transport("/unit", "HTTP 500")) },
        )
        .await
        .unwrap_err();

        let kinds: Vec<_> = err.failures().iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec![ErrorKind::DataUnavailable, ErrorKind::Transport]);
    }

    #[tokio::test]
    async fn test_blank_field_is_rejected() {
        let mut blank = identity();
        blank.phone = "   ".to_string();

        let err = fetch_and_merge(async { Ok::<_, PortalError>(blank) }, async { Ok::<_, PortalError>(property()) })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataUnavailable);
    }

    #[test]
    fn test_success_payload_requires_marker() {
        let body = json!({"Result": {"user": {}}});
        assert!(success_payload(&body, "/user").is_ok());

        let body = json!({"Error": "session expired"});
        let err = success_payload(&body, "/user").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataUnavailable);

        let body = json!({"Result": null});
        assert!(success_payload(&body, "/user").is_err());
    }

    #[test]
    fn test_text_at_reads_nested_strings_and_numbers() {
        let body = json!({"Unit": {"Unit": {"City": "Town", "Zip": 12345}}});
        assert_eq!(text_at(&body, &["Unit", "Unit", "City"], "/u").unwrap(), "Town");
        assert_eq!(text_at(&body, &["Unit", "Unit", "Zip"], "/u").unwrap(), "12345");
        assert!(text_at(&body, &["Unit", "State"], "/u").is_err());
    }
}
