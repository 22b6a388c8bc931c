//! 运行时配置
//!
//! 从命名变量读取配置（浏览器端为构建期注入的环境变量），缺失的可选项
//! 使用默认值，缺失的必填项返回 `Configuration` 错误。

use std::collections::HashMap;
use std::num::ParseIntError;
use std::str::FromStr;
use std::time::Duration;

use url::Url;
use url::form_urlencoded;

use crate::error::{PalError, PalResult};
use crate::session::FederatedProvider;
use crate::wait::WaitPolicy;

// =========================================================
// 变量名与默认值
// =========================================================

pub const VAR_API_BASE_URL: &str = "RECEIPTPAL_API_BASE_URL";
pub const VAR_COGNITO_REGION: &str = "RECEIPTPAL_COGNITO_REGION";
pub const VAR_COGNITO_CLIENT_ID: &str = "RECEIPTPAL_COGNITO_CLIENT_ID";
pub const VAR_COGNITO_DOMAIN: &str = "RECEIPTPAL_COGNITO_DOMAIN";
pub const VAR_REDIRECT_SIGN_IN: &str = "RECEIPTPAL_REDIRECT_SIGN_IN";
pub const VAR_REDIRECT_SIGN_OUT: &str = "RECEIPTPAL_REDIRECT_SIGN_OUT";
pub const VAR_OAUTH_SCOPES: &str = "RECEIPTPAL_OAUTH_SCOPES";
pub const VAR_GUARD_ATTEMPTS: &str = "RECEIPTPAL_GUARD_ATTEMPTS";
pub const VAR_GUARD_INTERVAL_MS: &str = "RECEIPTPAL_GUARD_INTERVAL_MS";
pub const VAR_GUARD_DEADLINE_MS: &str = "RECEIPTPAL_GUARD_DEADLINE_MS";
pub const VAR_SESSION_CHECK: &str = "RECEIPTPAL_SESSION_CHECK";

const DEFAULT_REGION: &str = "ap-southeast-2";
const DEFAULT_SCOPES: &str = "email openid profile";
const DEFAULT_REDIRECT: &str = "http://localhost:3000/";

/// 配置来源
pub trait ConfigSource {
    fn var(&self, name: &str) -> Option<String>;
}

impl ConfigSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl ConfigSource for HashMap<&str, &str> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).map(|v| v.to_string())
    }
}

// =========================================================
// 配置结构
// =========================================================

/// 守卫使用的会话存在性检查
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionCheck {
    /// `fetch_session` 返回令牌集合
    #[default]
    TokenSet,
    /// `get_current_user` 返回用户句柄
    CurrentUser,
}

impl SessionCheck {
    fn parse(raw: &str) -> PalResult<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "session" | "token" | "tokens" => Ok(Self::TokenSet),
            "user" | "current_user" => Ok(Self::CurrentUser),
            other => Err(PalError::configuration(format!(
                "unknown session check '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CognitoConfig {
    pub region: String,
    pub client_id: String,
    /// 托管登录页域名，不含协议
    pub domain: String,
    pub redirect_sign_in: Vec<String>,
    pub redirect_sign_out: Vec<String>,
    pub scopes: Vec<String>,
}

impl CognitoConfig {
    /// 用户池 JSON 协议入口
    pub fn endpoint(&self) -> String {
        format!("https://cognito-idp.{}.amazonaws.com/", self.region)
    }

    pub fn token_url(&self) -> String {
        format!("https://{}/oauth2/token", self.domain)
    }

    pub fn authorize_url(&self, provider: FederatedProvider, redirect_uri: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("identity_provider", provider.as_str())
            .append_pair("prompt", "select_account")
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("scope", &self.scopes.join(" "))
            .finish();
        format!("https://{}/oauth2/authorize?{}", self.domain, query)
    }

    pub fn logout_url(&self, logout_uri: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", &self.client_id)
            .append_pair("logout_uri", logout_uri)
            .finish();
        format!("https://{}/logout?{}", self.domain, query)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuardSettings {
    pub policy: WaitPolicy,
    pub check: SessionCheck,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// 后端 REST 根地址，不含末尾 `/`
    pub api_base_url: String,
    pub cognito: CognitoConfig,
    pub guard: GuardSettings,
}

impl AppConfig {
    pub fn from_source(source: &impl ConfigSource) -> PalResult<Self> {
        let api_base_url = required(source, VAR_API_BASE_URL)?;
        Url::parse(&api_base_url).map_err(|e| {
            PalError::configuration(format!("{VAR_API_BASE_URL} is not a URL"))
                .with_source(e)
                .in_op("config.load")
        })?;

        let cognito = CognitoConfig {
            region: optional(source, VAR_COGNITO_REGION)
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            client_id: required(source, VAR_COGNITO_CLIENT_ID)?,
            domain: required(source, VAR_COGNITO_DOMAIN)?
                .trim_start_matches("https://")
                .trim_end_matches('/')
                .to_string(),
            redirect_sign_in: list(source, VAR_REDIRECT_SIGN_IN, ',', DEFAULT_REDIRECT),
            redirect_sign_out: list(source, VAR_REDIRECT_SIGN_OUT, ',', DEFAULT_REDIRECT),
            scopes: list(source, VAR_OAUTH_SCOPES, ' ', DEFAULT_SCOPES),
        };

        let defaults = WaitPolicy::default();
        let guard = GuardSettings {
            policy: WaitPolicy {
                max_attempts: number::<u32>(source, VAR_GUARD_ATTEMPTS)?
                    .unwrap_or(defaults.max_attempts),
                interval: number(source, VAR_GUARD_INTERVAL_MS)?
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.interval),
                deadline: number(source, VAR_GUARD_DEADLINE_MS)?
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.deadline),
            },
            check: optional(source, VAR_SESSION_CHECK)
                .map(|raw| SessionCheck::parse(&raw))
                .transpose()?
                .unwrap_or_default(),
        };

        Ok(Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            cognito,
            guard,
        })
    }
}

fn optional(source: &impl ConfigSource, name: &str) -> Option<String> {
    source
        .var(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(source: &impl ConfigSource, name: &str) -> PalResult<String> {
    optional(source, name).ok_or_else(|| {
        PalError::configuration(format!("{name} is not set")).in_op("config.load")
    })
}

/// 超出目标类型范围的值同样视为配置错误
fn number<T>(source: &impl ConfigSource, name: &str) -> PalResult<Option<T>>
where
    T: FromStr<Err = ParseIntError>,
{
    optional(source, name)
        .map(|raw| {
            raw.parse::<T>().map_err(|e| {
                PalError::configuration(format!("{name} must be a non-negative integer"))
                    .with_source(e)
                    .in_op("config.load")
            })
        })
        .transpose()
}

fn list(source: &impl ConfigSource, name: &str, sep: char, default: &str) -> Vec<String> {
    optional(source, name)
        .unwrap_or_else(|| default.to_string())
        .split(sep)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// 从配置的回调地址中选择一个：以当前 origin 开头的优先，
/// 其次包含 `localhost` 的，最后第一个
pub fn select_redirect<'a>(urls: &'a [String], origin: &str) -> Option<&'a str> {
    urls.iter()
        .find(|u| !origin.is_empty() && u.starts_with(origin))
        .or_else(|| urls.iter().find(|u| u.contains("localhost")))
        .or_else(|| urls.first())
        .map(String::as_str)
}

#[cfg(test)]
pub mod tests {
    use super::*;

    pub fn test_source() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            (VAR_API_BASE_URL, "https://api.test/prod/"),
            (VAR_COGNITO_CLIENT_ID, "client-123"),
            (VAR_COGNITO_DOMAIN, "auth.test"),
            (
                VAR_REDIRECT_SIGN_IN,
                "http://localhost:3000/, https://app.test/",
            ),
            (
                VAR_REDIRECT_SIGN_OUT,
                "http://localhost:3000/, https://app.test/",
            ),
        ])
    }

    pub fn test_config() -> AppConfig {
        AppConfig::from_source(&test_source()).unwrap()
    }

    #[test]
    fn test_defaults_applied() {
        let config = test_config();
        assert_eq!(config.api_base_url, "https://api.test/prod");
        assert_eq!(config.cognito.region, "ap-southeast-2");
        assert_eq!(config.cognito.scopes, vec!["email", "openid", "profile"]);
        assert_eq!(config.guard.policy, WaitPolicy::default());
        assert_eq!(config.guard.check, SessionCheck::TokenSet);
        assert_eq!(
            config.cognito.endpoint(),
            "https://cognito-idp.ap-southeast-2.amazonaws.com/"
        );
    }

    #[test]
    fn test_guard_overrides() {
        let mut source = test_source();
        source.insert(VAR_GUARD_ATTEMPTS, "3");
        source.insert(VAR_GUARD_INTERVAL_MS, "50");
        source.insert(VAR_SESSION_CHECK, "user");
        let config = AppConfig::from_source(&source).unwrap();
        assert_eq!(config.guard.policy.max_attempts, 3);
        assert_eq!(config.guard.policy.interval, Duration::from_millis(50));
        assert_eq!(config.guard.policy.deadline, WaitPolicy::DEFAULT_DEADLINE);
        assert_eq!(config.guard.check, SessionCheck::CurrentUser);
    }

    #[test]
    fn test_missing_required_values() {
        for var in [VAR_API_BASE_URL, VAR_COGNITO_CLIENT_ID, VAR_COGNITO_DOMAIN] {
            let mut source = test_source();
            source.remove(var);
            let err = AppConfig::from_source(&source).unwrap_err();
            assert_eq!(err.kind, crate::error::ErrorKind::Configuration);
            assert!(err.message.contains(var));
        }
    }

    #[test]
    fn test_malformed_values() {
        let mut source = test_source();
        source.insert(VAR_GUARD_ATTEMPTS, "eight");
        assert!(AppConfig::from_source(&source).is_err());

        let mut source = test_source();
        source.insert(VAR_GUARD_ATTEMPTS, "4294967297");
        let err = AppConfig::from_source(&source).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Configuration);
        assert!(err.message.contains(VAR_GUARD_ATTEMPTS));

        let mut source = test_source();
        source.insert(VAR_API_BASE_URL, "not a url");
        assert!(AppConfig::from_source(&source).is_err());
    }

    #[test]
    fn test_select_redirect_order() {
        let urls = vec![
            "https://staging.test/".to_string(),
            "http://localhost:3000/".to_string(),
            "https://app.test/".to_string(),
        ];
        assert_eq!(select_redirect(&urls, "https://app.test"), Some("https://app.test/"));
        assert_eq!(select_redirect(&urls, "https://other.test"), Some("http://localhost:3000/"));
        assert_eq!(select_redirect(&urls[..1], "https://other.test"), Some("https://staging.test/"));
        assert_eq!(select_redirect(&[], "https://app.test"), None);
    }

    #[test]
    fn test_hosted_ui_urls() {
        let cognito = test_config().cognito;
        assert_eq!(
            cognito.logout_url("https://app.test/"),
            "https://auth.test/logout?client_id=client-123&logout_uri=https%3A%2F%2Fapp.test%2F"
        );
        let authorize = cognito.authorize_url(FederatedProvider::Google, "https://app.test/");
        assert!(authorize.starts_with("https://auth.test/oauth2/authorize?identity_provider=Google"));
        assert!(authorize.contains("response_type=code"));
        assert!(authorize.contains("prompt=select_account"));
        assert!(authorize.contains("scope=email+openid+profile"));
    }
}
