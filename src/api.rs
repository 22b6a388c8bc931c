use receiptpal_shared::protocol::{
    ANALYZE_RECEIPT_PATH, ApiRequest, ExpensesSummaryRequest, GetPreferencesRequest,
};
use receiptpal_shared::{
    AvatarUploadRequest, AvatarUploadTarget, DEFAULT_CONTENT_TYPE, ExpensesSummary,
    HEADER_AUTHORIZATION, HEADER_CONTENT_TYPE, HEADER_USER_EMAIL, Preferences, ProfileUpdate,
    Receipt,
};
use url::form_urlencoded;

use crate::error::{PalError, PalResult};
use crate::request::{HttpClient, HttpMethod, HttpRequest, HttpResponse};

// =========================================================
// 请求上下文
// =========================================================

/// 附加在后端请求上的身份头
#[derive(Debug, Clone, Copy, Default)]
pub struct Caller<'a> {
    /// 原样转发的身份令牌（不加 `Bearer ` 前缀）
    pub token: Option<&'a str>,
    pub email: Option<&'a str>,
}

impl<'a> Caller<'a> {
    pub fn token(token: &'a str) -> Self {
        Self {
            token: Some(token),
            email: None,
        }
    }

    pub fn with_email(mut self, email: &'a str) -> Self {
        self.email = Some(email);
        self
    }

    fn apply(&self, mut req: HttpRequest) -> HttpRequest {
        if let Some(token) = self.token {
            req = req.with_header(HEADER_AUTHORIZATION, token);
        }
        if let Some(email) = self.email.filter(|e| !e.is_empty()) {
            req = req.with_header(HEADER_USER_EMAIL, email);
        }
        req
    }
}

// =========================================================
// 后端 REST 客户端
// =========================================================

/// 这里接受任何实现了 HttpClient 的客户端，从而解耦了具体的 HTTP 实现
pub struct ReceiptApi<C> {
    client: C,
    base_url: String,
}

impl<C: HttpClient> ReceiptApi<C> {
    pub fn new(client: C, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// 发送 JSON 端点请求；GET 端点的字段编码进查询串
    pub async fn send<R: ApiRequest>(
        &self,
        body: &R,
        caller: Caller<'_>,
    ) -> PalResult<R::Response> {
        let mut url = self.url(R::PATH);
        let mut req = if R::HAS_BODY {
            HttpRequest::new(&url, R::METHOD).with_json(body)?
        } else {
            let query = query_string(body)?;
            if !query.is_empty() {
                url = format!("{url}?{query}");
            }
            HttpRequest::new(&url, R::METHOD)
        };
        req = caller.apply(req);

        let resp = self
            .client
            .send(req)
            .await
            .map_err(|e| e.in_op_with("api.send", R::PATH))?;
        ensure_success(&resp, R::PATH)?;
        // 204 / 空响应体按 JSON null 解析
        let text = if resp.body.trim().is_empty() { "null" } else { resp.body.as_str() };
        serde_json::from_str::<R::Response>(text)
            .map_err(|e| PalError::from(e).in_op_with("api.decode", R::PATH))
    }

    // --- 个人资料 ---

    pub async fn get_preferences(&self, caller: Caller<'_>) -> PalResult<Preferences> {
        self.send(&GetPreferencesRequest, caller).await
    }

    pub async fn update_profile(
        &self,
        update: &ProfileUpdate,
        caller: Caller<'_>,
    ) -> PalResult<()> {
        self.send(update, caller).await?;
        Ok(())
    }

    pub async fn request_avatar_upload(
        &self,
        req: &AvatarUploadRequest,
        caller: Caller<'_>,
    ) -> PalResult<AvatarUploadTarget> {
        self.send(req, caller).await
    }

    /// 直接 PUT 到预签名地址，不带身份头
    pub async fn upload_to_presigned(
        &self,
        upload_url: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> PalResult<()> {
        let req = HttpRequest::new(upload_url, HttpMethod::Put)
            .with_header(HEADER_CONTENT_TYPE, content_type)
            .with_bytes(bytes);
        let resp = self
            .client
            .send(req)
            .await
            .map_err(|e| e.in_op("api.upload_to_presigned"))?;
        if !resp.is_success() {
            return Err(PalError::upstream(format!("Avatar upload failed (HTTP {})", resp.status))
                .in_op("api.upload_to_presigned"));
        }
        Ok(())
    }

    // --- 收据 ---

    /// 上传原始图片字节，返回识别结果
    pub async fn analyze_receipt(
        &self,
        bytes: Vec<u8>,
        content_type: Option<&str>,
        caller: Caller<'_>,
    ) -> PalResult<Receipt> {
        let content_type = content_type
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE);
        let req = HttpRequest::new(&self.url(ANALYZE_RECEIPT_PATH), HttpMethod::Post)
            .with_header(HEADER_CONTENT_TYPE, content_type)
            .with_bytes(bytes);
        let req = caller.apply(req);

        let resp = self
            .client
            .send(req)
            .await
            .map_err(|e| e.in_op("api.analyze_receipt"))?;
        if !resp.is_success() {
            let message = resp
                .error_field()
                .unwrap_or_else(|| format!("Upload failed with status {}", resp.status));
            return Err(PalError::upstream(message).in_op("api.analyze_receipt"));
        }
        resp.json::<Receipt>()
            .map_err(|e| e.in_op("api.analyze_receipt"))
    }

    /// 全部时间范围的支出汇总；`ok: false` 视为失败
    pub async fn expenses_summary(&self, caller: Caller<'_>) -> PalResult<ExpensesSummary> {
        let summary = self.send(&ExpensesSummaryRequest::all(), caller).await?;
        if summary.ok == Some(false) {
            let message = summary
                .error
                .clone()
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| "Failed to load expenses".to_string());
            return Err(PalError::upstream(message).in_op("api.expenses_summary"));
        }
        Ok(summary)
    }
}

fn ensure_success(resp: &HttpResponse, path: &str) -> PalResult<()> {
    if resp.is_success() {
        return Ok(());
    }
    Err(PalError::upstream(resp.error_message())
        .in_op_with("api.send", format!("{path} {}", resp.status)))
}

fn query_string<R: serde::Serialize>(body: &R) -> PalResult<String> {
    let value = serde_json::to_value(body)?;
    let mut query = form_urlencoded::Serializer::new(String::new());
    if let serde_json::Value::Object(fields) = value {
        for (key, value) in fields {
            match value {
                serde_json::Value::Null => {}
                serde_json::Value::String(s) => {
                    query.append_pair(&key, &s);
                }
                other => {
                    query.append_pair(&key, &other.to_string());
                }
            }
        }
    }
    Ok(query.finish())
}
