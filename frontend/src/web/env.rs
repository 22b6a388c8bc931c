//! 构建期配置
//!
//! trunk 构建时的环境变量通过 `option_env!` 编译进产物，
//! 再交给核心库的 `AppConfig::from_source` 解析。

use std::collections::HashMap;

macro_rules! build_vars {
    ($($name:literal),* $(,)?) => {{
        let mut vars: HashMap<&'static str, &'static str> = HashMap::new();
        $(
            if let Some(value) = option_env!($name) {
                vars.insert($name, value);
            }
        )*
        vars
    }};
}

pub fn build_source() -> HashMap<&'static str, &'static str> {
    build_vars![
        "RECEIPTPAL_API_BASE_URL",
        "RECEIPTPAL_COGNITO_REGION",
        "RECEIPTPAL_COGNITO_CLIENT_ID",
        "RECEIPTPAL_COGNITO_DOMAIN",
        "RECEIPTPAL_REDIRECT_SIGN_IN",
        "RECEIPTPAL_REDIRECT_SIGN_OUT",
        "RECEIPTPAL_OAUTH_SCOPES",
        "RECEIPTPAL_GUARD_ATTEMPTS",
        "RECEIPTPAL_GUARD_INTERVAL_MS",
        "RECEIPTPAL_GUARD_DEADLINE_MS",
        "RECEIPTPAL_SESSION_CHECK",
    ]
}

/// 当前页面的 origin，例如 `https://app.example.com`
pub fn current_origin() -> String {
    web_sys::window()
        .and_then(|w| w.location().origin().ok())
        .unwrap_or_default()
}
