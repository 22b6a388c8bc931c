use leptos::prelude::*;
use leptos::task::spawn_local;
use receiptpal::account;
use receiptpal::identity::IdentityCache;

use crate::auth::use_auth;
use crate::web::router::{Link, use_router};

#[component]
pub fn Navbar() -> impl IntoView {
    let auth = use_auth();
    let router = use_router();
    let identity = auth.identity;

    let on_sign_out = move |_| {
        spawn_local(async move {
            let services = auth.services();
            let logout_url = services.logout_url();
            // 先让界面立即显示为未登录，不等身份服务往返
            services.cache.clear();
            auth.refresh_identity();
            account::sign_out(
                &services.auth,
                &services.cache,
                &router,
                &services.clock,
                &logout_url,
            )
            .await;
        });
    };

    view! {
        <div class="navbar bg-base-100 shadow-sm">
            <div class="flex-1 gap-2">
                <Link to="/" class="btn btn-ghost text-xl">"ReceiptPal"</Link>
                <Link to="/upload" class="btn btn-ghost btn-sm">"Upload"</Link>
                <Link to="/expenses" class="btn btn-ghost btn-sm">"Expenses"</Link>
                <Link to="/about" class="btn btn-ghost btn-sm">"About"</Link>
            </div>
            <div class="flex-none gap-2">
                <Show
                    when=move || identity.with(|i| i.looks_signed_in())
                    fallback=|| view! {
                        <Link to="/login" class="btn btn-ghost btn-sm">"Sign in"</Link>
                        <Link to="/register" class="btn btn-primary btn-sm">"Register"</Link>
                    }
                >
                    {move || identity.with(|i| i.avatar_url.clone()).map(|url| view! {
                        <img class="w-8 h-8 rounded-full" src=url alt="" />
                    })}
                    <Link to="/settings" class="btn btn-ghost btn-sm">
                        {move || identity.with(|i| i.display_name.clone())}
                    </Link>
                    <button class="btn btn-outline btn-sm" on:click=on_sign_out>"Sign out"</button>
                </Show>
            </div>
        </div>
    }
}
