//! 受保护页面的挂载守卫
//!
//! 每次挂载（以及同一路由下查询串或片段变化）都会重新评估一次；
//! 卸载时取消进行中的检查，旧一轮的结果由 `GuardMount` 丢弃。

use std::rc::Rc;

use leptos::prelude::*;
use leptos::task::spawn_local;
use receiptpal::account;
use receiptpal::guard::{GuardMount, GuardState, RouteGuard};
use receiptpal::location::LocationMarker;
use receiptpal::wait::{CancelOnDrop, cancellable};

use crate::auth::use_auth;
use crate::web::router::use_router;

#[component]
pub fn ProtectedRoute(children: ChildrenFn) -> impl IntoView {
    let auth = use_auth();
    let router = use_router();
    let mounted_route = router.current_route().get_untracked();

    let (state, set_state) = signal(GuardState::Checking);
    let mount = StoredValue::new_local(Rc::new(GuardMount::new()));
    let pending = StoredValue::new_local(None::<CancelOnDrop>);

    // 返回值是本轮的 search_key；只有查询串或片段变化时才重新评估
    Effect::new(move |previous: Option<String>| {
        let location = router.location().get();
        let key = location.search_key();
        if router.current_route().get_untracked() != mounted_route
            || previous.as_ref() == Some(&key)
        {
            return key;
        }

        let services = auth.services();
        let mount = mount.get_value();
        set_state.set(GuardState::Checking);

        let (handle, task) = cancellable(async move {
            let guard = RouteGuard::new(&services.auth, &services.clock, services.guard_config());
            let Some(resolved) = guard.run(&mount, &location, &router).await else {
                return;
            };
            set_state.set(resolved.clone());

            let is_callback = location.marker() == LocationMarker::OAuthCallback;
            if resolved == GuardState::Allowed && is_callback {
                // 失败时 code 也已从地址去掉，地址变化会触发重新评估
                let completed = account::complete_federated_sign_in(
                    &services.auth,
                    &services.cache,
                    &router,
                    &location,
                )
                .await;
                match completed {
                    Ok(_) => auth.refresh_identity(),
                    Err(e) => log::warn!("completing hosted sign-in failed: {e}"),
                }
            }
        });
        // 替换掉上一轮的句柄即取消上一轮
        pending.set_value(Some(handle.on_drop()));
        spawn_local(async move {
            let _ = task.await;
        });
        key
    });

    on_cleanup(move || {
        mount.with_value(|m| m.dispose());
        pending.set_value(None);
    });

    move || match state.get() {
        GuardState::Checking => view! {
            <div class="flex items-center justify-center min-h-[50vh] gap-3">
                <span class="loading loading-spinner loading-lg text-primary"></span>
                <span>"Checking session…"</span>
            </div>
        }
        .into_any(),
        GuardState::Allowed => children().into_any(),
        GuardState::Redirecting { .. } => ().into_any(),
    }
}
