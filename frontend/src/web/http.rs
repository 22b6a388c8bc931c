//! HTTP 适配
//!
//! 基于 `gloo-net` 的 fetch 封装实现核心库的 `HttpClient`。
//! 只有网络层失败才返回错误；任何收到的响应都交给调用方解释。

use gloo_net::http::{Method, RequestBuilder};
use receiptpal::error::{PalError, PalResult};
use receiptpal::request::{HttpBody, HttpClient, HttpMethod, HttpRequest, HttpResponse};

#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserHttpClient;

fn method(m: HttpMethod) -> Method {
    match m {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[async_trait::async_trait(?Send)]
impl HttpClient for BrowserHttpClient {
    async fn send(&self, req: HttpRequest) -> PalResult<HttpResponse> {
        let mut builder = RequestBuilder::new(&req.url).method(method(req.method));
        for (key, value) in &req.headers {
            builder = builder.header(key, value);
        }

        let request = match req.body {
            Some(HttpBody::Text(text)) => builder.body(text),
            Some(HttpBody::Bytes(bytes)) => {
                builder.body(js_sys::Uint8Array::from(bytes.as_slice()))
            }
            None => builder.build(),
        }
        .map_err(|e| {
            PalError::network(e.to_string()).in_op_with("http.build", req.method.as_str())
        })?;

        let resp = request
            .send()
            .await
            .map_err(|e| {
                PalError::network(e.to_string()).in_op_with("http.send", req.method.as_str())
            })?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| PalError::network(e.to_string()).in_op("http.read_body"))?;
        Ok(HttpResponse::new(status, body))
    }
}
