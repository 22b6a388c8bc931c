//! 上传页与支出页的业务流程

use receiptpal_shared::{ExpensesSummary, Receipt};

use crate::api::{Caller, ReceiptApi};
use crate::error::{PalError, PalResult};
use crate::identity::IdentityCache;
use crate::request::HttpClient;
use crate::session::AuthClient;

/// 用户选中的收据图片
#[derive(Clone, Default)]
pub struct ReceiptUpload {
    pub file_name: String,
    /// 浏览器报告的 MIME 类型，可能为空
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for ReceiptUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiptUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

pub async fn analyze<A, I, C>(
    auth: &A,
    cache: &I,
    api: &ReceiptApi<C>,
    upload: ReceiptUpload,
) -> PalResult<Receipt>
where
    A: AuthClient + ?Sized,
    I: IdentityCache + ?Sized,
    C: HttpClient,
{
    if upload.bytes.is_empty() {
        return Err(PalError::validation("Please choose a receipt image."));
    }

    // 没有会话时仍然上传，只带邮箱头
    let tokens = auth.fetch_session(false).await.ok();
    let email = cache.read().email;

    let mut caller = Caller::default().with_email(&email);
    caller.token = tokens.as_ref().and_then(|t| t.bearer());

    log::info!("analyzing {upload:?}");
    let content_type = Some(upload.content_type.as_str());
    api.analyze_receipt(upload.bytes, content_type, caller).await
}

pub async fn load_expenses<I, C>(cache: &I, api: &ReceiptApi<C>) -> PalResult<ExpensesSummary>
where
    I: IdentityCache + ?Sized,
    C: HttpClient,
{
    let email = cache.read().email;
    if email.trim().is_empty() {
        return Err(PalError::validation("No user email found. Please sign in again."));
    }
    api.expenses_summary(Caller::default().with_email(email.trim()))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::identity::CachedIdentity;
    use crate::identity::tests::memory_cache;
    use crate::request::HttpMethod;
    use crate::request::tests::MockHttpClient;
    use crate::session::tests::{ScriptedAuth, tokens_for};
    use serde_json::json;

    const BASE: &str = "https://api.test/prod";

    fn create_api() -> ReceiptApi<MockHttpClient> {
        ReceiptApi::new(MockHttpClient::new(), BASE)
    }

    fn upload(content_type: &str) -> ReceiptUpload {
        ReceiptUpload {
            file_name: "receipt.jpg".into(),
            content_type: content_type.into(),
            bytes: vec![0xFF, 0xD8, 0xFF],
        }
    }

    #[tokio::test]
    async fn test_analyze_sends_token_and_email() {
        let auth = ScriptedAuth::signed_in("ada@example.com");
        let cache = memory_cache();
        cache
            .write(&CachedIdentity::new("ada@example.com", "Ada"))
            .unwrap();
        let api = create_api();
        api.client().mock_response(
            HttpMethod::Post,
            &format!("{BASE}/analyze-receipt"),
            200,
            json!({ "vendor": "Cafe", "total": 12.5 }),
        );

        let receipt = analyze(&auth, &cache, &api, upload("image/jpeg")).await.unwrap();

        assert_eq!(receipt.total, Some(12.5));
        let sent = api.client().sent();
        assert_eq!(sent[0].header("Content-Type"), Some("image/jpeg"));
        assert_eq!(sent[0].header("X-User-Email"), Some("ada@example.com"));
        assert_eq!(
            sent[0].header("Authorization"),
            tokens_for("ada@example.com").id_token.as_deref()
        );
    }

    #[tokio::test]
    async fn test_analyze_without_session() {
        let auth = ScriptedAuth::new();
        let api = create_api();
        api.client().mock_response(
            HttpMethod::Post,
            &format!("{BASE}/analyze-receipt"),
            200,
            json!({ "items": [] }),
        );

        analyze(&auth, &memory_cache(), &api, upload("")).await.unwrap();

        let sent = api.client().sent();
        assert_eq!(sent[0].header("Authorization"), None);
        assert_eq!(sent[0].header("X-User-Email"), None);
        assert_eq!(sent[0].header("Content-Type"), Some("application/octet-stream"));
    }

    #[tokio::test]
    async fn test_analyze_rejects_empty_file() {
        let auth = ScriptedAuth::new();
        let api = create_api();

        let err = analyze(&auth, &memory_cache(), &api, ReceiptUpload::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(api.client().sent().is_empty());
    }

    #[tokio::test]
    async fn test_load_expenses_requires_cached_email() {
        let api = create_api();

        let err = load_expenses(&memory_cache(), &api).await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.message, "No user email found. Please sign in again.");
        assert!(api.client().sent().is_empty());
    }

    #[tokio::test]
    async fn test_load_expenses() {
        let cache = memory_cache();
        cache
            .write(&CachedIdentity::new("ada@example.com", "Ada"))
            .unwrap();
        let api = create_api();
        api.client().mock_response(
            HttpMethod::Get,
            &format!("{BASE}/expenses-summary?range=all"),
            200,
            json!({
                "ok": true,
                "summary": {
                    "monthly": [{ "ym": "2025-01", "total": 42.0 }],
                    "needsReviewCount": 2
                }
            }),
        );

        let summary = load_expenses(&cache, &api).await.unwrap();

        assert_eq!(summary.summary.monthly.len(), 1);
        assert_eq!(summary.summary.needs_review_count, 2);
        assert_eq!(
            api.client().sent()[0].header("X-User-Email"),
            Some("ada@example.com")
        );
    }
}
