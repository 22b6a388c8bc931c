//! 身份客户端契约
//!
//! 所有与身份提供方的交互都经过 `AuthClient`。令牌对客户端是不透明的：
//! 只读取其中的 claims 用于展示，原样转发给后端做鉴权。

use std::fmt;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{PalError, PalResult};

// =========================================================
// JWT
// =========================================================

/// 身份令牌中客户端关心的 claims
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub email_verified: Option<bool>,
    #[serde(rename = "cognito:username", default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    /// 过期时间（Unix 秒）
    #[serde(default)]
    pub exp: u64,
}

// 身份提供方有时把布尔 claim 编码成字符串 "true"
fn flexible_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }
    Ok(match Option::<Flag>::deserialize(d)? {
        Some(Flag::Bool(b)) => Some(b),
        Some(Flag::Text(s)) => Some(s.eq_ignore_ascii_case("true")),
        None => None,
    })
}

#[derive(Clone, PartialEq, Eq)]
pub struct Jwt {
    raw: String,
    claims: Claims,
}

impl Jwt {
    /// 解码 payload 段；不校验签名
    pub fn parse(raw: &str) -> PalResult<Self> {
        let mut segments = raw.split('.');
        let payload = match (segments.next(), segments.next(), segments.next()) {
            (Some(_), Some(payload), Some(_)) if !payload.is_empty() => payload,
            _ => return Err(PalError::serialization("malformed token").in_op("jwt.parse")),
        };
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| {
                PalError::serialization("token payload is not base64url")
                    .with_source(e)
                    .in_op("jwt.parse")
            })?;
        let claims: Claims =
            serde_json::from_slice(&bytes).map_err(|e| PalError::from(e).in_op("jwt.parse"))?;
        Ok(Self {
            raw: raw.to_string(),
            claims,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    pub fn expires_within(&self, now_secs: u64, skew_secs: u64) -> bool {
        self.claims.exp <= now_secs.saturating_add(skew_secs)
    }
}

impl fmt::Debug for Jwt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Jwt")
            .field("raw", &"<redacted>")
            .field("claims", &self.claims)
            .finish()
    }
}

// =========================================================
// 会话数据
// =========================================================

/// 身份提供方签发的令牌集合
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub id_token: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl TokenSet {
    /// 存在会话：身份令牌或访问令牌至少有一个
    pub fn is_present(&self) -> bool {
        self.id_token.is_some() || self.access_token.is_some()
    }

    /// `Authorization` 头的值：优先身份令牌，原样转发
    pub fn bearer(&self) -> Option<&str> {
        self.id_token.as_deref().or(self.access_token.as_deref())
    }

    pub fn id_jwt(&self) -> Option<Jwt> {
        self.id_token.as_deref().and_then(|t| Jwt::parse(t).ok())
    }

    pub fn id_claims(&self) -> Option<Claims> {
        self.id_jwt().map(|jwt| jwt.claims)
    }

    pub fn email(&self) -> Option<String> {
        self.id_claims().and_then(|c| c.email).filter(|e| !e.is_empty())
    }
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = |t: &Option<String>| if t.is_some() { "<present>" } else { "<none>" };
        f.debug_struct("TokenSet")
            .field("id_token", &mark(&self.id_token))
            .field("access_token", &mark(&self.access_token))
            .field("refresh_token", &mark(&self.refresh_token))
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserHandle {
    pub username: String,
    pub user_id: String,
}

impl UserHandle {
    /// `cognito:username`，缺失时用 `sub`
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            username: claims
                .username
                .clone()
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| claims.sub.clone()),
            user_id: claims.sub.clone(),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.trim().to_string(),
            password: password.to_string(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct SignUpRequest {
    pub username: String,
    pub password: String,
    pub email: String,
}

impl fmt::Debug for SignUpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignUpRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignUpOutcome {
    /// 用户池自动确认了该用户（无需验证码）
    pub user_confirmed: bool,
}

/// 托管登录页支持的外部身份提供方
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FederatedProvider {
    Google,
}

impl FederatedProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            FederatedProvider::Google => "Google",
        }
    }
}

// =========================================================
// 客户端契约
// =========================================================

/// 身份客户端特性 (Trait)
///
/// 没有会话时 `fetch_session` / `get_current_user` 返回 `NotAuthenticated`。
#[async_trait(?Send)]
pub trait AuthClient {
    async fn fetch_session(&self, force_refresh: bool) -> PalResult<TokenSet>;
    async fn get_current_user(&self) -> PalResult<UserHandle>;

    async fn sign_up(&self, req: &SignUpRequest) -> PalResult<SignUpOutcome>;
    async fn confirm_sign_up(&self, username: &str, code: &str) -> PalResult<()>;
    async fn sign_in(&self, credentials: &Credentials) -> PalResult<UserHandle>;
    /// 本地令牌无论成功与否都会被清除
    async fn sign_out(&self, global: bool) -> PalResult<()>;

    /// 托管登录页的授权地址；由调用方整页跳转
    fn federated_sign_in_url(&self, provider: FederatedProvider) -> PalResult<String>;
    async fn complete_federated_sign_in(&self, code: &str) -> PalResult<TokenSet>;

    async fn update_user_attributes(&self, attributes: &[(&str, &str)]) -> PalResult<()>;
    async fn confirm_user_attribute(&self, key: &str, code: &str) -> PalResult<()>;

    async fn reset_password(&self, username: &str) -> PalResult<()>;
    async fn confirm_reset_password(
        &self,
        username: &str,
        code: &str,
        new_password: &str,
    ) -> PalResult<()>;
}

// =========================================================
// 测试实现 (Mock)
// =========================================================

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::cell::{Cell, RefCell};
    use std::collections::{HashMap, VecDeque};
    use std::time::Duration;

    /// 2100-01-01，测试令牌默认不过期
    pub const FAR_FUTURE_EXP: u64 = 4_102_444_800;

    pub fn fake_jwt(claims: serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{header}.{payload}.signature")
    }

    pub fn tokens_for(email: &str) -> TokenSet {
        tokens_expiring(email, FAR_FUTURE_EXP)
    }

    pub fn tokens_expiring(email: &str, exp: u64) -> TokenSet {
        TokenSet {
            id_token: Some(fake_jwt(serde_json::json!({
                "sub": format!("sub-{email}"),
                "email": email,
                "email_verified": true,
                "cognito:username": email,
                "exp": exp,
            }))),
            access_token: Some(fake_jwt(serde_json::json!({
                "sub": format!("sub-{email}"),
                "exp": exp,
            }))),
            refresh_token: Some(format!("refresh-{email}")),
        }
    }

    /// 可编排的 AuthClient
    ///
    /// `fetch_session` 先消费 `sessions` 队列，队列为空后按当前会话回答。
    #[derive(Default)]
    pub struct ScriptedAuth {
        pub calls: RefCell<Vec<String>>,
        pub sessions: RefCell<VecDeque<PalResult<TokenSet>>>,
        pub session: RefCell<Option<TokenSet>>,
        pub failures: RefCell<HashMap<&'static str, (ErrorKind, String)>>,
        pub fetch_delay: Cell<Duration>,
        /// 为 true 时 `sign_out` 永不返回
        pub sign_out_hangs: Cell<bool>,
        pub auto_confirm: Cell<bool>,
        pub attributes: RefCell<Vec<(String, String)>>,
    }

    impl ScriptedAuth {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn signed_in(email: &str) -> Self {
            let auth = Self::new();
            *auth.session.borrow_mut() = Some(tokens_for(email));
            auth
        }

        /// 前 `n` 次 `fetch_session` 失败，之后返回 `email` 的会话
        pub fn hydrating_after(n: usize, email: &str) -> Self {
            let auth = Self::signed_in(email);
            for _ in 0..n {
                auth.sessions
                    .borrow_mut()
                    .push_back(Err(PalError::network("still hydrating")));
            }
            auth
        }

        pub fn fail(&self, op: &'static str, kind: ErrorKind, message: &str) {
            self.failures
                .borrow_mut()
                .insert(op, (kind, message.to_string()));
        }

        pub fn count(&self, op: &str) -> usize {
            self.calls.borrow().iter().filter(|c| c.as_str() == op).count()
        }

        pub fn ops(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }

        fn enter(&self, op: &'static str) -> PalResult<()> {
            self.calls.borrow_mut().push(op.to_string());
            match self.failures.borrow().get(op) {
                Some((kind, message)) => Err(PalError::new(*kind, message.clone()).in_op(op)),
                None => Ok(()),
            }
        }

        fn current(&self) -> PalResult<TokenSet> {
            self.session
                .borrow()
                .clone()
                .ok_or_else(|| PalError::not_authenticated("no session"))
        }
    }

    #[async_trait(?Send)]
    impl AuthClient for ScriptedAuth {
        async fn fetch_session(&self, _force_refresh: bool) -> PalResult<TokenSet> {
            self.enter("fetch_session")?;
            let delay = self.fetch_delay.get();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let scripted = self.sessions.borrow_mut().pop_front();
            match scripted {
                Some(result) => result,
                None => self.current(),
            }
        }

        async fn get_current_user(&self) -> PalResult<UserHandle> {
            self.enter("get_current_user")?;
            let tokens = self.current()?;
            tokens
                .id_claims()
                .map(|c| UserHandle::from_claims(&c))
                .ok_or_else(|| PalError::not_authenticated("no identity token"))
        }

        async fn sign_up(&self, _req: &SignUpRequest) -> PalResult<SignUpOutcome> {
            self.enter("sign_up")?;
            Ok(SignUpOutcome {
                user_confirmed: self.auto_confirm.get(),
            })
        }

        async fn confirm_sign_up(&self, _username: &str, _code: &str) -> PalResult<()> {
            self.enter("confirm_sign_up")
        }

        async fn sign_in(&self, credentials: &Credentials) -> PalResult<UserHandle> {
            self.enter("sign_in")?;
            let tokens = tokens_for(&credentials.username);
            let handle = tokens
                .id_claims()
                .map(|c| UserHandle::from_claims(&c))
                .ok_or_else(|| PalError::serialization("bad fake token"))?;
            *self.session.borrow_mut() = Some(tokens);
            Ok(handle)
        }

        async fn sign_out(&self, _global: bool) -> PalResult<()> {
            self.session.borrow_mut().take();
            self.enter("sign_out")?;
            if self.sign_out_hangs.get() {
                futures::future::pending::<()>().await;
            }
            Ok(())
        }

        fn federated_sign_in_url(&self, provider: FederatedProvider) -> PalResult<String> {
            Ok(format!(
                "https://auth.test/oauth2/authorize?identity_provider={}",
                provider.as_str()
            ))
        }

        async fn complete_federated_sign_in(&self, _code: &str) -> PalResult<TokenSet> {
            self.enter("complete_federated_sign_in")?;
            let tokens = tokens_for("google.user@example.com");
            *self.session.borrow_mut() = Some(tokens.clone());
            Ok(tokens)
        }

        async fn update_user_attributes(&self, attributes: &[(&str, &str)]) -> PalResult<()> {
            self.enter("update_user_attributes")?;
            self.attributes.borrow_mut().extend(
                attributes
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string())),
            );
            Ok(())
        }

        async fn confirm_user_attribute(&self, _key: &str, _code: &str) -> PalResult<()> {
            self.enter("confirm_user_attribute")
        }

        async fn reset_password(&self, _username: &str) -> PalResult<()> {
            self.enter("reset_password")
        }

        async fn confirm_reset_password(
            &self,
            _username: &str,
            _code: &str,
            _new_password: &str,
        ) -> PalResult<()> {
            self.enter("confirm_reset_password")
        }
    }

    #[test]
    fn test_jwt_parse_reads_cognito_claims() {
        let raw = fake_jwt(serde_json::json!({
            "sub": "abc",
            "email": "ada@example.com",
            "email_verified": "true",
            "cognito:username": "ada",
            "exp": 100,
        }));
        let jwt = Jwt::parse(&raw).unwrap();
        assert_eq!(jwt.claims().username.as_deref(), Some("ada"));
        assert_eq!(jwt.claims().email_verified, Some(true));
        assert_eq!(jwt.raw(), raw);
        assert!(jwt.expires_within(50, 60));
        assert!(!jwt.expires_within(30, 60));
    }

    #[test]
    fn test_jwt_parse_accepts_padded_payload() {
        let payload = base64::engine::general_purpose::URL_SAFE.encode(r#"{"sub":"x"}"#);
        assert!(payload.ends_with('='));
        let jwt = Jwt::parse(&format!("h.{payload}.s")).unwrap();
        assert_eq!(jwt.claims().sub, "x");
    }

    #[test]
    fn test_jwt_parse_rejects_garbage() {
        for raw in ["", "only-one", "a..c", "a.!!!.c", "a.bm90IGpzb24.c"] {
            let err = Jwt::parse(raw).unwrap_err();
            assert_eq!(err.kind, ErrorKind::Serialization, "{raw}");
        }
    }

    #[test]
    fn test_token_set_bearer_prefers_id_token() {
        let tokens = tokens_for("ada@example.com");
        assert_eq!(tokens.bearer(), tokens.id_token.as_deref());
        assert_eq!(tokens.email().as_deref(), Some("ada@example.com"));

        let access_only = TokenSet {
            access_token: Some("access".into()),
            ..Default::default()
        };
        assert!(access_only.is_present());
        assert_eq!(access_only.bearer(), Some("access"));
        assert!(!TokenSet::default().is_present());
    }

    #[test]
    fn test_debug_output_redacts_secrets() {
        let rendered = format!(
            "{:?} {:?}",
            tokens_for("ada@example.com"),
            Credentials::new("ada@example.com", "hunter22")
        );
        assert!(!rendered.contains("hunter22"));
        assert!(!rendered.contains("signature"));
    }

    #[test]
    fn test_user_handle_falls_back_to_sub() {
        let claims = Claims {
            sub: "sub-1".into(),
            ..Default::default()
        };
        assert_eq!(UserHandle::from_claims(&claims).username, "sub-1");
    }
}
