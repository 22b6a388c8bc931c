//! ReceiptPal 前端应用
//!
//! 采用 Context-Driven 架构：
//! - `web`: 浏览器适配（存储、时钟、HTTP、History 路由）
//! - `auth`: 组装核心服务并共享身份状态
//! - `components`: 页面与 UI 组件；受保护页面包在 `ProtectedRoute` 中

mod auth;
mod components {
    mod alert;
    pub mod confirm;
    pub mod expenses;
    mod field;
    pub mod home;
    pub mod login;
    pub mod navbar;
    pub mod protected;
    pub mod register;
    pub mod reset;
    pub mod settings;
    pub mod upload;
}

// 浏览器适配层：核心库各个 trait 的浏览器实现
pub(crate) mod web {
    mod env;
    mod file;
    mod http;
    pub mod router;
    mod storage;
    mod timer;

    pub use env::{build_source, current_origin};
    pub use file::{PickedFile, first_file, read_file};
    pub use http::BrowserHttpClient;
    pub use storage::BrowserStore;
    pub use timer::BrowserClock;
}

use crate::auth::{AuthContext, Services};
use crate::components::confirm::ConfirmPage;
use crate::components::expenses::ExpensesPage;
use crate::components::home::{AboutPage, HomePage};
use crate::components::login::LoginPage;
use crate::components::navbar::Navbar;
use crate::components::protected::ProtectedRoute;
use crate::components::register::RegisterPage;
use crate::components::reset::ResetPage;
use crate::components::settings::SettingsPage;
use crate::components::upload::UploadPage;

use leptos::prelude::*;
use receiptpal::route::AppRoute;
use web::router::{Router, RouterOutlet};

/// 路由匹配函数
///
/// 根据 AppRoute 枚举返回对应的视图组件；需要认证的路由包在守卫里。
fn route_matcher(route: AppRoute) -> AnyView {
    match route {
        AppRoute::Home => view! { <HomePage /> }.into_any(),
        AppRoute::About => view! { <AboutPage /> }.into_any(),
        AppRoute::Register => view! { <RegisterPage /> }.into_any(),
        AppRoute::Login => view! { <LoginPage /> }.into_any(),
        AppRoute::Confirm => view! { <ConfirmPage /> }.into_any(),
        AppRoute::Reset => view! { <ResetPage /> }.into_any(),
        AppRoute::Upload => protected(|| view! { <UploadPage /> }.into_any()),
        AppRoute::Expenses => protected(|| view! { <ExpensesPage /> }.into_any()),
        AppRoute::Settings => protected(|| view! { <SettingsPage /> }.into_any()),
        AppRoute::NotFound => view! {
            <div class="flex items-center justify-center min-h-[70vh]">
                <div class="text-center">
                    <h1 class="text-6xl font-bold text-error">"404"</h1>
                    <p class="text-xl mt-4">"Page not found"</p>
                </div>
            </div>
        }
        .into_any(),
    }
}

fn protected(page: fn() -> AnyView) -> AnyView {
    view! { <ProtectedRoute>{page()}</ProtectedRoute> }.into_any()
}

#[component]
pub fn App() -> impl IntoView {
    let services = match Services::from_browser() {
        Ok(services) => services,
        Err(e) => {
            log::error!("invalid build configuration: {e}");
            return view! {
                <div role="alert" class="alert alert-error m-8">
                    {format!("ReceiptPal is not configured: {}", e.message())}
                </div>
            }
            .into_any();
        }
    };

    // 1. 创建认证上下文
    let auth_ctx = AuthContext::new(services);
    provide_context(auth_ctx);

    view! {
        // 2. 路由器组件：维护当前地址信号
        <Router>
            <Navbar />
            <main>
                <RouterOutlet matcher=route_matcher />
            </main>
        </Router>
    }
    .into_any()
}
