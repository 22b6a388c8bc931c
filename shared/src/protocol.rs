use crate::{AvatarUploadRequest, AvatarUploadTarget, ExpensesSummary, Preferences, ProfileUpdate};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// HTTP Methods for API Requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// A trait that defines the request-response relationship and metadata for a JSON endpoint.
pub trait ApiRequest: Serialize {
    /// The response type returned by this request.
    type Response: DeserializeOwned;
    /// The URL path (or suffix).
    const PATH: &'static str;
    /// The HTTP method.
    const METHOD: HttpMethod;
    /// Whether the request carries a JSON body (GET endpoints don't).
    const HAS_BODY: bool = true;
}

// =========================================================
// Request Definitions
// =========================================================

/// Load profile + preferences
#[derive(Debug, Serialize, Deserialize)]
pub struct GetPreferencesRequest;

impl ApiRequest for GetPreferencesRequest {
    type Response = Preferences;
    const PATH: &'static str = "/me/preferences";
    const METHOD: HttpMethod = HttpMethod::Get;
    const HAS_BODY: bool = false;
}

impl ApiRequest for ProfileUpdate {
    type Response = serde_json::Value;
    const PATH: &'static str = "/me/profile";
    const METHOD: HttpMethod = HttpMethod::Put;
}

impl ApiRequest for AvatarUploadRequest {
    type Response = AvatarUploadTarget;
    const PATH: &'static str = "/me/profile/avatar-url";
    const METHOD: HttpMethod = HttpMethod::Post;
}

/// Aggregated expenses; the range travels in the query string.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExpensesSummaryRequest {
    pub range: String,
}

impl ExpensesSummaryRequest {
    pub fn all() -> Self {
        Self {
            range: "all".to_string(),
        }
    }
}

impl ApiRequest for ExpensesSummaryRequest {
    type Response = ExpensesSummary;
    const PATH: &'static str = "/expenses-summary";
    const METHOD: HttpMethod = HttpMethod::Get;
    const HAS_BODY: bool = false;
}

/// Raw-image endpoint; the body is the image bytes, not JSON.
pub const ANALYZE_RECEIPT_PATH: &str = "/analyze-receipt";
