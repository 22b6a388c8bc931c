//! 账户相关页面的业务流程
//!
//! 每个函数对应一个页面动作，只依赖 trait（身份客户端、身份缓存、
//! 后端客户端、导航），页面组件只负责收集输入与展示结果。

use std::time::Duration;

use futures::future::{self, Either};
use receiptpal_shared::{AvatarUploadRequest, Preferences, ProfileUpdate};

use crate::api::{Caller, ReceiptApi};
use crate::clock::Clock;
use crate::error::{PalError, PalResult};
use crate::identity::{CachedIdentity, IdentityCache};
use crate::location::Location;
use crate::nav::Navigator;
use crate::request::HttpClient;
use crate::session::{AuthClient, Claims, Credentials, FederatedProvider, SignUpRequest};

pub const MIN_PASSWORD_LEN: usize = 8;

const MSG_EMAIL_REQUIRED: &str = "Please enter your email.";
const MSG_CODE_REQUIRED: &str = "Enter the verification code.";
const MSG_PASSWORD_TOO_SHORT: &str = "Password must be at least 8 characters.";
const MSG_PASSWORD_MISMATCH: &str = "Passwords do not match.";

// =========================================================
// 身份推导
// =========================================================

/// 由 claims 推导缓存身份：邮箱取 `email` → `cognito:username` → `fallback_email`
pub fn identity_from_claims(claims: Option<&Claims>, fallback_email: &str) -> CachedIdentity {
    let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty());

    let email = claims
        .and_then(|c| non_empty(&c.email).or_else(|| non_empty(&c.username)))
        .unwrap_or_else(|| fallback_email.trim().to_string());

    let display_name = claims
        .and_then(|c| {
            non_empty(&c.name).or_else(|| {
                let parts: Vec<String> = [non_empty(&c.given_name), non_empty(&c.family_name)]
                    .into_iter()
                    .flatten()
                    .collect();
                (!parts.is_empty()).then(|| parts.join(" "))
            })
        })
        .or_else(|| (!email.is_empty()).then(|| email.clone()))
        .unwrap_or_else(|| "User".to_string());

    CachedIdentity {
        display_name,
        email,
        email_verified: claims.and_then(|c| c.email_verified).unwrap_or(false),
        avatar_url: claims.and_then(|c| non_empty(&c.picture)),
    }
}

async fn current_claims<A: AuthClient + ?Sized>(auth: &A) -> Option<Claims> {
    auth.fetch_session(false)
        .await
        .ok()
        .and_then(|tokens| tokens.id_claims())
}

fn require_code(code: &str) -> PalResult<&str> {
    let code = code.trim();
    if code.is_empty() {
        return Err(PalError::validation(MSG_CODE_REQUIRED));
    }
    Ok(code)
}

fn require_email(email: &str) -> PalResult<&str> {
    let email = email.trim();
    if email.is_empty() {
        return Err(PalError::validation(MSG_EMAIL_REQUIRED));
    }
    Ok(email)
}

// =========================================================
// 注册
// =========================================================

#[derive(Clone, Default)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// 需要邮件验证码，跳转到确认页
    VerificationRequired { email: String },
    /// 用户池自动确认并已登录
    SignedIn(CachedIdentity),
}

pub async fn register<A, I>(auth: &A, cache: &I, form: &RegisterForm) -> PalResult<RegisterOutcome>
where
    A: AuthClient + ?Sized,
    I: IdentityCache + ?Sized,
{
    let email = require_email(&form.email)?;
    if form.password != form.confirm_password {
        return Err(PalError::validation(MSG_PASSWORD_MISMATCH));
    }

    let outcome = auth
        .sign_up(&SignUpRequest {
            username: email.to_string(),
            password: form.password.clone(),
            email: email.to_string(),
        })
        .await?;

    if outcome.user_confirmed {
        let identity = sign_in(auth, cache, &Credentials::new(email, &form.password)).await?;
        return Ok(RegisterOutcome::SignedIn(identity));
    }

    cache.set_pending_verification(email)?;
    log::info!("sign-up pending verification");
    Ok(RegisterOutcome::VerificationRequired {
        email: email.to_string(),
    })
}

pub async fn confirm_registration<A, I>(
    auth: &A,
    cache: &I,
    email: &str,
    code: &str,
) -> PalResult<()>
where
    A: AuthClient + ?Sized,
    I: IdentityCache + ?Sized,
{
    let email = require_email(email)?;
    let code = require_code(code)?;
    auth.confirm_sign_up(email, code).await?;
    cache.clear_pending_verification();
    Ok(())
}

// =========================================================
// 登录 / 登出
// =========================================================

/// 先清除残留会话（失败忽略），再登录并写入身份缓存
pub async fn sign_in<A, I>(
    auth: &A,
    cache: &I,
    credentials: &Credentials,
) -> PalResult<CachedIdentity>
where
    A: AuthClient + ?Sized,
    I: IdentityCache + ?Sized,
{
    require_email(&credentials.username)?;
    if let Err(e) = auth.sign_out(false).await {
        log::warn!("clearing stale session failed: {e}");
    }

    auth.sign_in(credentials).await?;

    let claims = current_claims(auth).await;
    let identity = identity_from_claims(claims.as_ref(), &credentials.username);
    cache.write(&identity)?;
    Ok(identity)
}

/// 登录页挂载时调用：已有会话则写入身份并返回，页面据此跳转
pub async fn restore_session<A, I>(auth: &A, cache: &I) -> PalResult<Option<CachedIdentity>>
where
    A: AuthClient + ?Sized,
    I: IdentityCache + ?Sized,
{
    let user = match auth.get_current_user().await {
        Ok(user) => user,
        Err(e) => {
            log::debug!("no session to restore: {}", e.error_code());
            return Ok(None);
        }
    };
    let claims = current_claims(auth).await;
    let identity = identity_from_claims(claims.as_ref(), &user.username);
    cache.write(&identity)?;
    Ok(Some(identity))
}

/// 整页跳转到托管登录页；控制权不会回到当前页面
pub async fn start_federated_sign_in<A, N>(
    auth: &A,
    navigator: &N,
    provider: FederatedProvider,
) -> PalResult<()>
where
    A: AuthClient + ?Sized,
    N: Navigator + ?Sized,
{
    if let Err(e) = auth.sign_out(true).await {
        log::warn!("pre-redirect sign-out failed: {e}");
    }
    let url = auth.federated_sign_in_url(provider)?;
    navigator.assign(&url);
    Ok(())
}

/// 受保护页面经回调地址挂载后兑换授权码，并从地址中去掉 `code`
pub async fn complete_federated_sign_in<A, I, N>(
    auth: &A,
    cache: &I,
    navigator: &N,
    location: &Location,
) -> PalResult<CachedIdentity>
where
    A: AuthClient + ?Sized,
    I: IdentityCache + ?Sized,
    N: Navigator + ?Sized,
{
    let code = location
        .callback_code()
        .ok_or_else(|| PalError::validation("Missing authorization code."))?;

    // 无论兑换成功与否都要去掉 `code`，否则回调例外会在该地址上一直放行
    let result = match auth.complete_federated_sign_in(&code).await {
        Ok(tokens) => {
            let identity = identity_from_claims(tokens.id_claims().as_ref(), "");
            cache.write(&identity).map(|()| identity)
        }
        Err(e) => Err(e),
    };
    navigator.replace(&location.without_callback());
    result
}

/// 全局登出的等待上限，超时后照常跳转
pub const SIGN_OUT_DEADLINE: Duration = Duration::from_millis(2000);

/// 先清空身份缓存，再尽力全局登出（最多等 `SIGN_OUT_DEADLINE`），最后跳转到托管登出页
pub async fn sign_out<A, I, N, C>(
    auth: &A,
    cache: &I,
    navigator: &N,
    clock: &C,
    logout_url: &str,
) where
    A: AuthClient + ?Sized,
    I: IdentityCache + ?Sized,
    N: Navigator + ?Sized,
    C: Clock + ?Sized,
{
    cache.clear();
    match future::select(auth.sign_out(true), clock.sleep(SIGN_OUT_DEADLINE)).await {
        Either::Left((Ok(()), _)) => {}
        Either::Left((Err(e), _)) => log::warn!("global sign-out failed: {e}"),
        Either::Right(_) => log::warn!("global sign-out timed out after {SIGN_OUT_DEADLINE:?}"),
    }
    navigator.assign(logout_url);
}

// =========================================================
// 找回密码
// =========================================================

pub async fn request_password_reset<A>(auth: &A, email: &str) -> PalResult<String>
where
    A: AuthClient + ?Sized,
{
    let email = require_email(email)?;
    auth.reset_password(email).await?;
    Ok(email.to_string())
}

#[derive(Clone, Default)]
pub struct ResetForm {
    pub email: String,
    pub code: String,
    pub password: String,
    pub confirm_password: String,
}

pub async fn confirm_password_reset<A>(auth: &A, form: &ResetForm) -> PalResult<()>
where
    A: AuthClient + ?Sized,
{
    let email = require_email(&form.email)?;
    let code = require_code(&form.code)?;
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(PalError::validation(MSG_PASSWORD_TOO_SHORT));
    }
    if form.password != form.confirm_password {
        return Err(PalError::validation(MSG_PASSWORD_MISMATCH));
    }
    auth.confirm_reset_password(email, code, &form.password).await
}

// =========================================================
// 账户设置
// =========================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailChangeStep {
    /// 输入为空或与当前邮箱相同
    Unchanged,
    CodeSent { email: String },
}

pub async fn start_email_change<A: AuthClient + ?Sized>(
    auth: &A,
    current: &str,
    requested: &str,
) -> PalResult<EmailChangeStep> {
    let requested = requested.trim();
    if requested.is_empty() || requested == current.trim() {
        return Ok(EmailChangeStep::Unchanged);
    }
    auth.update_user_attributes(&[("email", requested)]).await?;
    Ok(EmailChangeStep::CodeSent {
        email: requested.to_string(),
    })
}

/// 确认新邮箱；返回最终写入缓存的邮箱
pub async fn confirm_email_change<A, I, C>(
    auth: &A,
    api: &ReceiptApi<C>,
    cache: &I,
    code: &str,
    requested: &str,
) -> PalResult<String>
where
    A: AuthClient + ?Sized,
    I: IdentityCache + ?Sized,
    C: HttpClient,
{
    let code = require_code(code)?;
    auth.confirm_user_attribute("email", code).await?;

    // 新的身份令牌才带有新邮箱
    let tokens = auth.fetch_session(true).await?;

    let mut email = requested.trim().to_string();
    if let Some(token) = tokens.bearer() {
        match api.get_preferences(Caller::token(token)).await {
            Ok(prefs) if !prefs.profile.email.is_empty() => email = prefs.profile.email,
            Ok(_) => {}
            Err(e) => log::warn!("reloading preferences after email change failed: {e}"),
        }
    }

    let mut identity = cache.read();
    identity.email = email.clone();
    identity.email_verified = true;
    cache.write(&identity)?;
    Ok(email)
}

/// 设置页数据：后端偏好（失败时用默认值）叠加身份令牌中的邮箱信息
pub async fn load_settings<A, C>(auth: &A, api: &ReceiptApi<C>) -> PalResult<Preferences>
where
    A: AuthClient + ?Sized,
    C: HttpClient,
{
    let tokens = auth.fetch_session(false).await?;
    let token = tokens
        .bearer()
        .ok_or_else(|| PalError::not_authenticated("Not authenticated"))?;

    let mut prefs = match api.get_preferences(Caller::token(token)).await {
        Ok(prefs) => prefs,
        Err(e) => {
            log::warn!("load settings failed: {e}");
            Preferences::default()
        }
    };

    if let Some(claims) = tokens.id_claims() {
        if let Some(email) = claims.email.filter(|e| !e.is_empty()) {
            prefs.profile.email = email;
            prefs.profile.email_verified = claims.email_verified.unwrap_or(false);
        }
    }
    Ok(prefs)
}

#[derive(Debug, Clone, Default)]
pub struct ProfileForm {
    pub first_name: String,
    pub last_name: String,
    /// 当前头像地址，未选择新头像时原样提交
    pub avatar_url: String,
}

#[derive(Clone)]
pub struct AvatarFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for AvatarFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvatarFile")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

pub async fn save_profile<A, I, C>(
    auth: &A,
    api: &ReceiptApi<C>,
    cache: &I,
    form: &ProfileForm,
    avatar: Option<AvatarFile>,
) -> PalResult<CachedIdentity>
where
    A: AuthClient + ?Sized,
    I: IdentityCache + ?Sized,
    C: HttpClient,
{
    let tokens = auth.fetch_session(false).await?;
    let token = tokens
        .bearer()
        .ok_or_else(|| PalError::not_authenticated("Not authenticated"))?;
    let caller = Caller::token(token);

    let mut avatar_url = form.avatar_url.clone();
    if let Some(file) = avatar {
        let target = api
            .request_avatar_upload(
                &AvatarUploadRequest {
                    file_name: file.name.clone(),
                    content_type: file.content_type.clone(),
                },
                caller,
            )
            .await?;
        if target.upload_url.is_empty() || target.public_url.is_empty() {
            return Err(
                PalError::upstream("Failed to get upload URL").in_op("account.save_profile")
            );
        }
        api.upload_to_presigned(&target.upload_url, &file.content_type, file.bytes)
            .await?;
        avatar_url = target.public_url;
    }

    let update = ProfileUpdate {
        first_name: form.first_name.trim().to_string(),
        last_name: form.last_name.trim().to_string(),
        avatar_url: avatar_url.clone(),
    };
    api.update_profile(&update, caller).await?;

    let full_name = [update.first_name.as_str(), update.last_name.as_str()]
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");

    let mut identity = cache.read();
    identity.display_name = if full_name.is_empty() { "User".to_string() } else { full_name };
    identity.avatar_url = (!avatar_url.is_empty()).then_some(avatar_url);
    cache.write(&identity)?;
    Ok(identity)
}
