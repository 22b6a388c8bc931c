//! Cognito 用户池客户端
//!
//! 通过 `HttpClient` 直接调用用户池的 JSON 协议
//! (`X-Amz-Target: AWSCognitoIdentityProviderService.*`)，
//! 令牌持久化在 `KeyValueStore` 中。托管登录页的授权码在
//! `/oauth2/token` 端点兑换。

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::clock::Clock;
use crate::config::{CognitoConfig, select_redirect};
use crate::error::{ErrorKind, PalError, PalResult};
use crate::identity::KeyValueStore;
use crate::request::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use crate::session::{
    AuthClient, Credentials, FederatedProvider, SignUpOutcome, SignUpRequest, TokenSet,
    UserHandle,
};

/// 持久化令牌的存储键
pub const TOKEN_STORAGE_KEY: &str = "receiptpal.session";

/// 身份令牌剩余有效期低于该值时提前刷新
pub const EXPIRY_SKEW_SECS: u64 = 60;

const TARGET_PREFIX: &str = "AWSCognitoIdentityProviderService";
const AMZ_JSON: &str = "application/x-amz-json-1.1";
const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

// =========================================================
// 协议结构
// =========================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthResponse {
    authentication_result: Option<AuthenticationResult>,
    challenge_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthenticationResult {
    id_token: Option<String>,
    access_token: Option<String>,
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SignUpResponse {
    #[serde(default)]
    user_confirmed: bool,
}

/// `/oauth2/token` 响应
#[derive(Debug, Deserialize)]
struct OAuthTokenResponse {
    id_token: Option<String>,
    access_token: Option<String>,
    refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct AttributeType<'a> {
    name: &'a str,
    value: &'a str,
}

/// 空响应体 `{}`
#[derive(Debug, Deserialize)]
struct Empty {}

// =========================================================
// 错误映射
// =========================================================

/// 把用户池的错误响应映射为 `PalError`
pub fn map_provider_error(action: &str, resp: &HttpResponse) -> PalError {
    let body: serde_json::Value = serde_json::from_str(&resp.body).unwrap_or_default();
    let error_type = body
        .get("__type")
        .or_else(|| body.get("error"))
        .and_then(|t| t.as_str())
        .map(|t| t.rsplit('#').next().unwrap_or(t).to_string())
        .unwrap_or_default();
    let message = body
        .get("message")
        .or_else(|| body.get("Message"))
        .or_else(|| body.get("error_description"))
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", resp.status));

    let kind = match error_type.as_str() {
        "NotAuthorizedException" | "UserNotFoundException" | "invalid_grant" => {
            ErrorKind::InvalidCredentials
        }
        "UsernameExistsException"
        | "InvalidPasswordException"
        | "InvalidParameterException"
        | "CodeMismatchException"
        | "ExpiredCodeException"
        | "UserNotConfirmedException"
        | "LimitExceededException"
        | "AliasExistsException"
        | "invalid_request" => ErrorKind::Validation,
        _ if resp.status >= 500 => ErrorKind::NetworkTransient,
        _ => ErrorKind::Upstream,
    };

    PalError::new(kind, message).in_op_with(format!("cognito.{action}"), error_type)
}

// =========================================================
// 客户端
// =========================================================

pub struct CognitoAuthClient<H, S, C> {
    config: CognitoConfig,
    http: H,
    store: S,
    clock: C,
    /// 当前页面 origin，用于选择回调地址
    origin: String,
}

impl<H, S, C> CognitoAuthClient<H, S, C>
where
    H: HttpClient,
    S: KeyValueStore,
    C: Clock,
{
    pub fn new(config: CognitoConfig, http: H, store: S, clock: C, origin: &str) -> Self {
        Self {
            config,
            http,
            store,
            clock,
            origin: origin.trim_end_matches('/').to_string(),
        }
    }

    pub fn config(&self) -> &CognitoConfig {
        &self.config
    }

    pub fn http(&self) -> &H {
        &self.http
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn redirect_uri(&self) -> PalResult<String> {
        select_redirect(&self.config.redirect_sign_in, &self.origin)
            .map(str::to_string)
            .ok_or_else(|| PalError::configuration("no sign-in redirect configured"))
    }

    // --- 令牌持久化 ---

    pub fn load_tokens(&self) -> Option<TokenSet> {
        let raw = self.store.get(TOKEN_STORAGE_KEY)?;
        match serde_json::from_str::<TokenSet>(&raw) {
            Ok(tokens) if tokens.is_present() => Some(tokens),
            Ok(_) => None,
            Err(e) => {
                log::warn!("discarding unreadable stored session: {e}");
                self.store.remove(TOKEN_STORAGE_KEY);
                None
            }
        }
    }

    fn save_tokens(&self, tokens: &TokenSet) -> PalResult<()> {
        let raw = serde_json::to_string(tokens)?;
        self.store.set(TOKEN_STORAGE_KEY, &raw)
    }

    fn clear_tokens(&self) {
        self.store.remove(TOKEN_STORAGE_KEY);
    }

    // --- 传输 ---

    async fn call<T: DeserializeOwned>(
        &self,
        action: &str,
        body: serde_json::Value,
    ) -> PalResult<T> {
        log::debug!("cognito {action}");
        let req = HttpRequest::new(&self.config.endpoint(), HttpMethod::Post)
            .with_header("Content-Type", AMZ_JSON)
            .with_header("X-Amz-Target", &format!("{TARGET_PREFIX}.{action}"))
            .with_text(body.to_string());

        let resp = self
            .http
            .send(req)
            .await
            .map_err(|e| e.in_op(format!("cognito.{action}")))?;
        if !resp.is_success() {
            return Err(map_provider_error(action, &resp));
        }
        resp.json::<T>()
            .map_err(|e| e.in_op(format!("cognito.{action}")))
    }

    async fn initiate_auth(&self, flow: &str, params: serde_json::Value) -> PalResult<TokenSet> {
        let resp: InitiateAuthResponse = self
            .call(
                "InitiateAuth",
                json!({
                    "AuthFlow": flow,
                    "ClientId": self.config.client_id,
                    "AuthParameters": params,
                }),
            )
            .await?;

        match resp.authentication_result {
            Some(result) => Ok(TokenSet {
                id_token: result.id_token,
                access_token: result.access_token,
                refresh_token: result.refresh_token,
            }),
            None => Err(PalError::validation(format!(
                "Additional sign-in step required: {}",
                resp.challenge_name.unwrap_or_else(|| "unknown".to_string())
            ))
            .in_op("cognito.InitiateAuth")),
        }
    }

    async fn refresh(&self, current: TokenSet) -> PalResult<TokenSet> {
        let Some(refresh_token) = current.refresh_token.clone() else {
            self.clear_tokens();
            return Err(PalError::not_authenticated("session expired").in_op("cognito.refresh"));
        };

        match self
            .initiate_auth("REFRESH_TOKEN_AUTH", json!({ "REFRESH_TOKEN": refresh_token }))
            .await
        {
            Ok(fresh) => {
                let tokens = TokenSet {
                    refresh_token: fresh.refresh_token.or(current.refresh_token),
                    ..fresh
                };
                self.save_tokens(&tokens)?;
                Ok(tokens)
            }
            Err(e) if e.is_transient() => Err(e),
            Err(e) => {
                log::warn!("session refresh rejected, clearing tokens: {e}");
                self.clear_tokens();
                Err(PalError::not_authenticated("session expired")
                    .with_source(e)
                    .in_op("cognito.refresh"))
            }
        }
    }

    async fn access_token(&self) -> PalResult<String> {
        self.fetch_session(false)
            .await?
            .access_token
            .ok_or_else(|| PalError::not_authenticated("no access token"))
    }
}

#[async_trait(?Send)]
impl<H, S, C> AuthClient for CognitoAuthClient<H, S, C>
where
    H: HttpClient,
    S: KeyValueStore,
    C: Clock,
{
    async fn fetch_session(&self, force_refresh: bool) -> PalResult<TokenSet> {
        let tokens = self
            .load_tokens()
            .ok_or_else(|| PalError::not_authenticated("no session"))?;

        let expiring = tokens
            .id_jwt()
            .is_none_or(|jwt| jwt.expires_within(self.clock.now_secs(), EXPIRY_SKEW_SECS));
        if force_refresh || expiring {
            return self.refresh(tokens).await;
        }
        Ok(tokens)
    }

    async fn get_current_user(&self) -> PalResult<UserHandle> {
        self.load_tokens()
            .and_then(|t| t.id_claims())
            .map(|claims| UserHandle::from_claims(&claims))
            .ok_or_else(|| PalError::not_authenticated("no current user"))
    }

    async fn sign_up(&self, req: &SignUpRequest) -> PalResult<SignUpOutcome> {
        let attributes = [AttributeType {
            name: "email",
            value: &req.email,
        }];
        let resp: SignUpResponse = self
            .call(
                "SignUp",
                json!({
                    "ClientId": self.config.client_id,
                    "Username": req.username,
                    "Password": req.password,
                    "UserAttributes": attributes,
                }),
            )
            .await?;
        Ok(SignUpOutcome {
            user_confirmed: resp.user_confirmed,
        })
    }

    async fn confirm_sign_up(&self, username: &str, code: &str) -> PalResult<()> {
        self.call::<Empty>(
            "ConfirmSignUp",
            json!({
                "ClientId": self.config.client_id,
                "Username": username,
                "ConfirmationCode": code,
            }),
        )
        .await?;
        Ok(())
    }

    async fn sign_in(&self, credentials: &Credentials) -> PalResult<UserHandle> {
        let tokens = self
            .initiate_auth(
                "USER_PASSWORD_AUTH",
                json!({
                    "USERNAME": credentials.username,
                    "PASSWORD": credentials.password,
                }),
            )
            .await?;
        let claims = tokens
            .id_jwt()
            .map(|jwt| jwt.claims().clone())
            .ok_or_else(|| PalError::serialization("identity token missing or unreadable"))?;
        self.save_tokens(&tokens)?;
        log::info!("signed in (sub {})", claims.sub);
        Ok(UserHandle::from_claims(&claims))
    }

    async fn sign_out(&self, global: bool) -> PalResult<()> {
        let tokens = self.load_tokens();
        self.clear_tokens();

        let access_token = tokens.and_then(|t| t.access_token);
        match access_token {
            Some(access_token) if global => {
                self.call::<Empty>("GlobalSignOut", json!({ "AccessToken": access_token }))
                    .await?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn federated_sign_in_url(&self, provider: FederatedProvider) -> PalResult<String> {
        Ok(self.config.authorize_url(provider, &self.redirect_uri()?))
    }

    async fn complete_federated_sign_in(&self, code: &str) -> PalResult<TokenSet> {
        let redirect_uri = self.redirect_uri()?;
        let form = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "authorization_code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("code", code)
            .append_pair("redirect_uri", &redirect_uri)
            .finish();
        let req = HttpRequest::new(&self.config.token_url(), HttpMethod::Post)
            .with_header("Content-Type", FORM_URLENCODED)
            .with_text(form);

        let resp = self
            .http
            .send(req)
            .await
            .map_err(|e| e.in_op("cognito.oauth2_token"))?;
        if !resp.is_success() {
            return Err(map_provider_error("oauth2_token", &resp));
        }
        let body: OAuthTokenResponse = resp.json()?;
        let tokens = TokenSet {
            id_token: body.id_token,
            access_token: body.access_token,
            refresh_token: body.refresh_token,
        };
        if !tokens.is_present() {
            return Err(PalError::upstream("token endpoint returned no tokens")
                .in_op("cognito.oauth2_token"));
        }
        self.save_tokens(&tokens)?;
        log::info!("federated sign-in completed");
        Ok(tokens)
    }

    async fn update_user_attributes(&self, attributes: &[(&str, &str)]) -> PalResult<()> {
        let access_token = self.access_token().await?;
        let attributes: Vec<AttributeType> = attributes
            .iter()
            .map(|&(name, value)| AttributeType { name, value })
            .collect();
        self.call::<serde_json::Value>(
            "UpdateUserAttributes",
            json!({ "AccessToken": access_token, "UserAttributes": attributes }),
        )
        .await?;
        Ok(())
    }

    async fn confirm_user_attribute(&self, key: &str, code: &str) -> PalResult<()> {
        let access_token = self.access_token().await?;
        self.call::<Empty>(
            "VerifyUserAttribute",
            json!({ "AccessToken": access_token, "AttributeName": key, "Code": code }),
        )
        .await?;
        Ok(())
    }

    async fn reset_password(&self, username: &str) -> PalResult<()> {
        self.call::<serde_json::Value>(
            "ForgotPassword",
            json!({ "ClientId": self.config.client_id, "Username": username }),
        )
        .await?;
        Ok(())
    }

    async fn confirm_reset_password(
        &self,
        username: &str,
        code: &str,
        new_password: &str,
    ) -> PalResult<()> {
        self.call::<Empty>(
            "ConfirmForgotPassword",
            json!({
                "ClientId": self.config.client_id,
                "Username": username,
                "ConfirmationCode": code,
                "Password": new_password,
            }),
        )
        .await?;
        Ok(())
    }
}
