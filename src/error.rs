use serde::{Deserialize, Serialize};

// =========================================================
// 错误类别
// =========================================================

/// Error categories, each carrying the policy the UI applies to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// No valid session. Expected state, resolved by redirect, never shown.
    NotAuthenticated,
    /// Wrong username/password or unknown user.
    InvalidCredentials,
    /// Form or provider-side validation failure, shown next to the form.
    Validation,
    /// Transport failure or 5xx. Retried by the guard, generic message elsewhere.
    NetworkTransient,
    /// Non-2xx answer from a backend endpoint.
    Upstream,
    /// JSON or token payload could not be decoded.
    Serialization,
    /// Durable client storage refused a write.
    Storage,
    /// Required configuration value is missing or malformed.
    Configuration,
}

impl ErrorKind {
    pub fn error_code(&self) -> &'static str {
        match self {
            ErrorKind::NotAuthenticated => "NOT_AUTHENTICATED",
            ErrorKind::InvalidCredentials => "INVALID_CREDENTIALS",
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::NetworkTransient => "NETWORK_TRANSIENT",
            ErrorKind::Upstream => "UPSTREAM_ERROR",
            ErrorKind::Serialization => "SERIALIZATION",
            ErrorKind::Storage => "STORAGE",
            ErrorKind::Configuration => "CONFIGURATION",
        }
    }
}

// =========================================================
// 错误上下文追踪
// =========================================================

/// One step of the operation trail attached to an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorSpan {
    /// Operation name, e.g. "cognito.initiate_auth" or "api.get_preferences"
    pub operation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorSpan {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            detail: None,
        }
    }

    pub fn with_detail(operation: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            detail: Some(detail.into()),
        }
    }
}

// =========================================================
// 核心错误类型
// =========================================================

/// Client-side error: kind + user-facing message + optional source + trail.
#[derive(Debug, thiserror::Error)]
#[error("[{}] {}{}", .kind.error_code(), .message, render_spans(.spans))]
pub struct PalError {
    pub kind: ErrorKind,
    pub message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    spans: Vec<ErrorSpan>,
}

fn render_spans(spans: &[ErrorSpan]) -> String {
    if spans.is_empty() {
        return String::new();
    }
    let trail: Vec<String> = spans
        .iter()
        .map(|span| match &span.detail {
            Some(detail) => format!("{}({})", span.operation, detail),
            None => span.operation.clone(),
        })
        .collect();
    format!(" | trace: {}", trail.join(" -> "))
}

impl PalError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
            spans: Vec::new(),
        }
    }

    // --- Convenience constructors ---

    pub fn not_authenticated(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotAuthenticated, message)
    }

    pub fn invalid_credentials(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidCredentials, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NetworkTransient, message)
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Upstream, message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Serialization, message)
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    // --- Context builders ---

    pub fn in_op(mut self, operation: impl Into<String>) -> Self {
        self.spans.push(ErrorSpan::new(operation));
        self
    }

    pub fn in_op_with(mut self, operation: impl Into<String>, detail: impl Into<String>) -> Self {
        self.spans.push(ErrorSpan::with_detail(operation, detail));
        self
    }

    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // --- Accessors / policy ---

    pub fn error_code(&self) -> &'static str {
        self.kind.error_code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn spans(&self) -> &[ErrorSpan] {
        &self.spans
    }

    /// Worth another attempt inside a bounded retry loop.
    pub fn is_transient(&self) -> bool {
        matches!(self.kind, ErrorKind::NetworkTransient)
    }

    /// Resolved by navigation rather than by showing text.
    pub fn is_silent(&self) -> bool {
        matches!(self.kind, ErrorKind::NotAuthenticated)
    }

    /// Text for an inline error banner next to the form that failed.
    pub fn user_message(&self) -> String {
        match self.kind {
            ErrorKind::NetworkTransient => {
                "Something went wrong. Please check your connection and try again.".to_string()
            }
            ErrorKind::Serialization | ErrorKind::Storage | ErrorKind::Configuration => {
                "Something went wrong. Please try again.".to_string()
            }
            _ if self.message.is_empty() => "Request failed.".to_string(),
            _ => self.message.clone(),
        }
    }
}

pub type PalResult<T> = std::result::Result<T, PalError>;

impl From<serde_json::Error> for PalError {
    fn from(e: serde_json::Error) -> Self {
        PalError::serialization(e.to_string()).with_source(e)
    }
}
