//! 认证模块
//!
//! 组装核心库的服务（身份客户端、后端客户端、身份缓存），
//! 并通过 Context 在组件间共享。展示用的身份信息是一个信号，
//! 各页面在写入缓存后调用 `refresh_identity` 同步界面。

use std::rc::Rc;

use leptos::prelude::*;
use receiptpal::api::ReceiptApi;
use receiptpal::cognito::CognitoAuthClient;
use receiptpal::config::{AppConfig, select_redirect};
use receiptpal::error::PalResult;
use receiptpal::guard::GuardConfig;
use receiptpal::identity::{CachedIdentity, IdentityCache, StoredIdentityCache};

use crate::web::{BrowserClock, BrowserHttpClient, BrowserStore, build_source, current_origin};

pub type Auth = CognitoAuthClient<BrowserHttpClient, BrowserStore, BrowserClock>;
pub type Api = ReceiptApi<BrowserHttpClient>;
pub type Cache = StoredIdentityCache<BrowserStore>;

/// 应用级服务
pub struct Services {
    pub config: AppConfig,
    pub auth: Auth,
    pub api: Api,
    pub cache: Cache,
    pub clock: BrowserClock,
    origin: String,
}

impl Services {
    pub fn from_browser() -> PalResult<Self> {
        let config = AppConfig::from_source(&build_source())?;
        let origin = current_origin();
        let auth = CognitoAuthClient::new(
            config.cognito.clone(),
            BrowserHttpClient,
            BrowserStore,
            BrowserClock,
            &origin,
        );
        let api = ReceiptApi::new(BrowserHttpClient, &config.api_base_url);
        Ok(Self {
            config,
            auth,
            api,
            cache: StoredIdentityCache::new(BrowserStore),
            clock: BrowserClock,
            origin,
        })
    }

    pub fn guard_config(&self) -> GuardConfig {
        GuardConfig::from(&self.config.guard)
    }

    /// 托管登录页的登出地址，回跳到与当前 origin 匹配的地址
    pub fn logout_url(&self) -> String {
        let cognito = &self.config.cognito;
        let target = select_redirect(&cognito.redirect_sign_out, &self.origin).unwrap_or("/");
        cognito.logout_url(target)
    }
}

/// 认证上下文
#[derive(Clone, Copy)]
pub struct AuthContext {
    services: StoredValue<Rc<Services>, LocalStorage>,
    /// 导航栏等处展示的身份信息
    pub identity: RwSignal<CachedIdentity>,
}

impl AuthContext {
    pub fn new(services: Services) -> Self {
        let identity = RwSignal::new(services.cache.read());
        Self {
            services: StoredValue::new_local(Rc::new(services)),
            identity,
        }
    }

    pub fn services(&self) -> Rc<Services> {
        self.services.get_value()
    }

    /// 从缓存重新读取身份信息
    pub fn refresh_identity(&self) {
        let identity = self.services.with_value(|s| s.cache.read());
        self.identity.set(identity);
    }
}

/// 从 Context 获取认证上下文
pub fn use_auth() -> AuthContext {
    use_context::<AuthContext>().expect("AuthContext should be provided")
}
