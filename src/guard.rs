//! 路由守卫
//!
//! 受保护页面挂载时（以及地址的查询串/片段变化时）决定放行还是重定向：
//!
//! 1. 地址带有 OAuth 回调 `code` → 立即放行，不询问身份客户端；
//! 2. 否则在有界重试内确认会话存在，首次成功即放行；
//! 3. 重试耗尽（或超出总体预算）→ 以替换历史记录的方式跳转到登录页。
//!
//! 判定本身是纯函数 `evaluate`；`RouteGuard` 负责重试，
//! `GuardMount` 负责丢弃卸载后或已被取代的评估结果。

use std::cell::{Cell, RefCell};

use uuid::Uuid;

use crate::clock::Clock;
use crate::config::{GuardSettings, SessionCheck};
use crate::location::{Location, LocationMarker};
use crate::nav::Navigator;
use crate::route::AppRoute;
use crate::session::AuthClient;
use crate::wait::{WaitPolicy, await_condition};

// =========================================================
// 纯判定
// =========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Pending,
    Allow,
    Deny,
}

/// 会话检查的结论
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionProbe {
    /// 尚未检查
    Unknown,
    Verified,
    /// 重试耗尽仍未确认
    Absent,
}

pub fn evaluate(marker: LocationMarker, probe: SessionProbe) -> Decision {
    match (marker, probe) {
        (LocationMarker::OAuthCallback, _) => Decision::Allow,
        (LocationMarker::None, SessionProbe::Verified) => Decision::Allow,
        (LocationMarker::None, SessionProbe::Absent) => Decision::Deny,
        (LocationMarker::None, SessionProbe::Unknown) => Decision::Pending,
    }
}

// =========================================================
// 状态机
// =========================================================

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GuardState {
    #[default]
    Checking,
    Allowed,
    Redirecting { to: AppRoute, replace: bool },
}

impl GuardState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GuardState::Checking)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardConfig {
    pub policy: WaitPolicy,
    pub check: SessionCheck,
    pub redirect_to: AppRoute,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            policy: WaitPolicy::default(),
            check: SessionCheck::default(),
            redirect_to: AppRoute::auth_failure_redirect(),
        }
    }
}

impl From<&GuardSettings> for GuardConfig {
    fn from(settings: &GuardSettings) -> Self {
        Self {
            policy: settings.policy,
            check: settings.check,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardOutcome {
    pub state: GuardState,
    /// 对身份客户端的检查次数
    pub attempts: u32,
}

pub struct RouteGuard<'a, A: ?Sized, C: ?Sized> {
    auth: &'a A,
    clock: &'a C,
    config: GuardConfig,
}

impl<'a, A, C> RouteGuard<'a, A, C>
where
    A: AuthClient + ?Sized,
    C: Clock + ?Sized,
{
    pub fn new(auth: &'a A, clock: &'a C, config: GuardConfig) -> Self {
        Self {
            auth,
            clock,
            config,
        }
    }

    /// 对一次挂载/地址变化做出终态判定
    pub async fn resolve(&self, location: &Location) -> GuardOutcome {
        let run_id = Uuid::new_v4();
        let marker = location.marker();

        if evaluate(marker, SessionProbe::Unknown) == Decision::Allow {
            log::info!("[guard {run_id}] {}: oauth callback, allowed", location.path);
            return GuardOutcome {
                state: GuardState::Allowed,
                attempts: 0,
            };
        }

        let outcome = await_condition(self.clock, &self.config.policy, |attempt| {
            self.probe_once(run_id, attempt)
        })
        .await;
        let attempts = outcome.attempts();
        let probe = if outcome.is_satisfied() {
            SessionProbe::Verified
        } else {
            SessionProbe::Absent
        };

        let state = match evaluate(marker, probe) {
            Decision::Allow => GuardState::Allowed,
            Decision::Deny => GuardState::Redirecting {
                to: self.config.redirect_to,
                replace: true,
            },
            Decision::Pending => GuardState::Checking,
        };
        log::info!(
            "[guard {run_id}] {}: {:?} after {attempts} attempt(s)",
            location.path,
            state
        );
        GuardOutcome { state, attempts }
    }

    /// 在挂载上下文中评估：结果过期（已卸载或被新一轮取代）时不生效，
    /// 生效的重定向通过 `navigator.replace` 执行一次
    pub async fn run<N>(
        &self,
        mount: &GuardMount,
        location: &Location,
        navigator: &N,
    ) -> Option<GuardState>
    where
        N: Navigator + ?Sized,
    {
        let generation = mount.begin();
        let outcome = self.resolve(location).await;
        if !mount.complete(generation, outcome.state.clone()) {
            log::debug!("guard result for {} discarded (generation {generation})", location.path);
            return None;
        }
        if let GuardState::Redirecting { to, replace } = &outcome.state {
            if *replace {
                navigator.replace(to.to_path());
            } else {
                navigator.push(to.to_path());
            }
        }
        Some(outcome.state)
    }

    async fn probe_once(&self, run_id: Uuid, attempt: u32) -> Option<()> {
        let result = match self.config.check {
            SessionCheck::TokenSet => self
                .auth
                .fetch_session(false)
                .await
                .map(|tokens| tokens.is_present()),
            SessionCheck::CurrentUser => self.auth.get_current_user().await.map(|_| true),
        };
        match result {
            Ok(true) => Some(()),
            Ok(false) => {
                log::debug!("[guard {run_id}] attempt {attempt}: empty session");
                None
            }
            Err(e) => {
                log::debug!("[guard {run_id}] attempt {attempt}: {}", e.error_code());
                None
            }
        }
    }
}

// =========================================================
// 挂载生命周期
// =========================================================

/// 单个受保护页面实例的评估代次
///
/// 每次 `begin` 产生新的代次，旧代次的结果一律丢弃；`dispose` 之后
/// 不再接受任何结果。
#[derive(Debug, Default)]
pub struct GuardMount {
    generation: Cell<u64>,
    disposed: Cell<bool>,
    state: RefCell<GuardState>,
}

impl GuardMount {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> u64 {
        let next = self.generation.get() + 1;
        self.generation.set(next);
        *self.state.borrow_mut() = GuardState::Checking;
        next
    }

    pub fn is_current(&self, generation: u64) -> bool {
        !self.disposed.get() && self.generation.get() == generation
    }

    /// 应用终态；过期的代次返回 false
    pub fn complete(&self, generation: u64, state: GuardState) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        *self.state.borrow_mut() = state;
        true
    }

    pub fn dispose(&self) {
        self.disposed.set(true);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    pub fn state(&self) -> GuardState {
        self.state.borrow().clone()
    }
}

#[cfg(test)]
mod tests;
