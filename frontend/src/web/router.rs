//! 路由服务模块 - 核心引擎
//!
//! 封装了 web_sys 的 History API，所有对 window.history 的操作都集中在此模块。
//! 当前地址是一个信号，路由由地址派生；访问控制不在这里做，
//! 而是由受保护页面自己的 `ProtectedRoute` 在挂载时完成。

use leptos::prelude::*;
use receiptpal::location::Location;
use receiptpal::nav::Navigator;
use receiptpal::route::AppRoute;
use wasm_bindgen::prelude::*;

/// 获取当前浏览器地址
fn current_location() -> Location {
    web_sys::window()
        .and_then(|w| w.location().href().ok())
        .map(|href| Location::parse(&href))
        .unwrap_or_default()
}

/// 推送 History 状态（内部工具函数）
fn push_history_state(path: &str) {
    if let Some(window) = web_sys::window() {
        if let Ok(history) = window.history() {
            let _ = history.push_state_with_url(&JsValue::NULL, "", Some(path));
        }
    }
}

/// 替换 History 状态（内部工具函数，用于重定向）
fn replace_history_state(path: &str) {
    if let Some(window) = web_sys::window() {
        if let Ok(history) = window.history() {
            let _ = history.replace_state_with_url(&JsValue::NULL, "", Some(path));
        }
    }
}

/// 路由器服务
///
/// 封装所有路由操作，通过 Signal 驱动界面更新。
#[derive(Clone, Copy)]
pub struct RouterService {
    location: RwSignal<Location>,
    route: Memo<AppRoute>,
}

impl RouterService {
    fn new() -> Self {
        let location = RwSignal::new(current_location());
        let route = Memo::new(move |_| location.with(|l| AppRoute::from_path(&l.path)));
        Self { location, route }
    }

    /// 当前地址（路径、查询串、片段）
    pub fn location(&self) -> RwSignal<Location> {
        self.location
    }

    /// 当前路由；地址变化但路由不变时不会通知
    pub fn current_route(&self) -> Memo<AppRoute> {
        self.route
    }

    /// 站内跳转（pushState）
    pub fn navigate(&self, path: &str) {
        push_history_state(path);
        self.location.set(Location::parse(path));
    }

    /// 初始化浏览器后退/前进按钮监听
    fn init_popstate_listener(&self) {
        let location = self.location;

        let closure = Closure::<dyn Fn()>::new(move || {
            location.set(current_location());
        });

        if let Some(window) = web_sys::window() {
            let _ = window
                .add_event_listener_with_callback("popstate", closure.as_ref().unchecked_ref());
        }

        // 泄漏闭包以保持监听器存活
        closure.forget();
    }
}

impl Navigator for RouterService {
    fn push(&self, path: &str) {
        self.navigate(path);
    }

    fn replace(&self, path: &str) {
        replace_history_state(path);
        self.location.set(Location::parse(path));
    }

    fn assign(&self, url: &str) {
        let result = web_sys::window()
            .ok_or_else(|| JsValue::from_str("no window"))
            .and_then(|w| w.location().assign(url));
        if let Err(e) = result {
            log::error!("full-page navigation failed: {e:?}");
        }
    }
}

/// 提供路由服务到 Context 并初始化
fn provide_router() -> RouterService {
    let router = RouterService::new();
    router.init_popstate_listener();
    provide_context(router);
    router
}

/// 从 Context 获取路由服务
pub fn use_router() -> RouterService {
    use_context::<RouterService>()
        .expect("RouterService not found in context. Ensure Router is provided.")
}

// ============================================================================
// UI 组件
// ============================================================================

/// 路由器根组件
#[component]
pub fn Router(children: Children) -> impl IntoView {
    provide_router();
    children()
}

/// 路由出口组件
///
/// 根据当前路由渲染对应的组件；同一路由下仅查询串变化时不会重建页面。
#[component]
pub fn RouterOutlet(
    /// 路由匹配函数：接收当前路由，返回对应视图
    matcher: fn(AppRoute) -> AnyView,
) -> impl IntoView {
    let router = use_router();

    move || {
        let current = router.current_route().get();
        matcher(current)
    }
}

/// 站内链接，拦截点击并走 pushState
#[component]
pub fn Link(
    /// 目标路径
    #[prop(into)]
    to: String,
    #[prop(optional, into)] class: String,
    children: Children,
) -> impl IntoView {
    let router = use_router();

    let target = to.clone();
    let on_click = move |ev: web_sys::MouseEvent| {
        ev.prevent_default();
        router.navigate(&target);
    };

    view! {
        <a href=to class=class on:click=on_click>
            {children()}
        </a>
    }
}
