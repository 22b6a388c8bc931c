use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

use crate::error::{PalError, PalResult};

pub use receiptpal_shared::protocol::HttpMethod;

// =========================================================
// 核心抽象层 (HTTP Interface Abstraction)
// =========================================================

/// 请求体
#[derive(Debug, Clone, PartialEq)]
pub enum HttpBody {
    Text(String),
    Bytes(Vec<u8>),
}

/// 通用 HTTP 请求结构
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub method: HttpMethod,
    pub headers: HashMap<String, String>,
    pub body: Option<HttpBody>,
}

impl HttpRequest {
    pub fn new(url: &str, method: HttpMethod) -> Self {
        Self {
            url: url.to_string(),
            method,
            headers: HashMap::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_json<T: Serialize>(self, body: &T) -> PalResult<Self> {
        let text = serde_json::to_string(body)?;
        Ok(self
            .with_header("Content-Type", "application/json")
            .with_text(text))
    }

    pub fn with_text(mut self, body: String) -> Self {
        self.body = Some(HttpBody::Text(body));
        self
    }

    pub fn with_bytes(mut self, body: Vec<u8>) -> Self {
        self.body = Some(HttpBody::Bytes(body));
        self
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }
}

/// 通用 HTTP 响应结构
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> PalResult<T> {
        serde_json::from_str(&self.body).map_err(PalError::from)
    }

    /// 错误响应体中的 `error`，其次 `message`
    pub fn error_field(&self) -> Option<String> {
        serde_json::from_str::<serde_json::Value>(&self.body)
            .ok()
            .and_then(|v| {
                v.get("error")
                    .or_else(|| v.get("message"))
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .filter(|m| !m.is_empty())
    }

    /// 取不到错误字段时返回 `HTTP {status}`
    pub fn error_message(&self) -> String {
        self.error_field()
            .unwrap_or_else(|| format!("HTTP {}", self.status))
    }
}

/// HTTP 客户端特性 (Trait)
///
/// 传输层失败（无法建立连接等）返回 `NetworkTransient`；
/// 任何收到的响应（包括 4xx/5xx）都以 `Ok(HttpResponse)` 返回，由调用方解释状态码。
#[async_trait::async_trait(?Send)]
pub trait HttpClient {
    async fn send(&self, req: HttpRequest) -> PalResult<HttpResponse>;
}

// =========================================================
// 测试实现 (Mock)
// =========================================================
