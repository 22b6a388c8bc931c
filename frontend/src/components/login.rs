use leptos::prelude::*;
use leptos::task::spawn_local;
use receiptpal::account;
use receiptpal::route::AppRoute;
use receiptpal::session::{Credentials, FederatedProvider};

use crate::auth::use_auth;
use crate::components::alert::{ErrorAlert, NoticeAlert};
use crate::web::router::{Link, use_router};

#[component]
pub fn LoginPage() -> impl IntoView {
    let auth = use_auth();
    let router = use_router();

    let (email, set_email) = signal(String::new());
    let (password, set_password) = signal(String::new());
    let (is_submitting, set_is_submitting) = signal(false);
    let (error_msg, set_error_msg) = signal(Option::<String>::None);
    let (success_msg, set_success_msg) = signal(Option::<String>::None);

    // 已有会话则直接进入上传页
    spawn_local(async move {
        let services = auth.services();
        match account::restore_session(&services.auth, &services.cache).await {
            Ok(Some(_)) => {
                auth.refresh_identity();
                router.navigate(AppRoute::auth_success_redirect().to_path());
            }
            Ok(None) => {}
            Err(e) => log::warn!("restoring session failed: {e}"),
        }
    });

    let on_submit = move |ev: leptos::web_sys::SubmitEvent| {
        ev.prevent_default();
        set_is_submitting.set(true);
        set_error_msg.set(None);

        let credentials = Credentials::new(&email.get(), &password.get());
        spawn_local(async move {
            let services = auth.services();
            match account::sign_in(&services.auth, &services.cache, &credentials).await {
                Ok(_) => {
                    auth.refresh_identity();
                    set_success_msg.set(Some("Login successful! Redirecting...".to_string()));
                    router.navigate(AppRoute::auth_success_redirect().to_path());
                }
                Err(e) => set_error_msg.set(Some(e.user_message())),
            }
            set_is_submitting.set(false);
        });
    };

    let on_google = move |_| {
        spawn_local(async move {
            let services = auth.services();
            let started =
                account::start_federated_sign_in(&services.auth, &router, FederatedProvider::Google)
                    .await;
            if let Err(e) = started {
                set_error_msg.set(Some(e.user_message()));
            }
        });
    };

    view! {
        <div class="hero min-h-[80vh] bg-base-200">
            <div class="hero-content flex-col w-full max-w-md">
                <h1 class="text-3xl font-bold">"Sign in to ReceiptPal"</h1>
                <div class="card shrink-0 w-full shadow-2xl bg-base-100">
                    <form class="card-body" on:submit=on_submit>
                        <ErrorAlert message=error_msg />
                        <NoticeAlert message=success_msg />

                        <div class="form-control">
                            <label class="label" for="email">
                                <span class="label-text">"Email"</span>
                            </label>
                            <input
                                id="email"
                                type="email"
                                on:input=move |ev| set_email.set(event_target_value(&ev))
                                prop:value=email
                                class="input input-bordered"
                                required
                            />
                        </div>
                        <div class="form-control">
                            <label class="label" for="password">
                                <span class="label-text">"Password"</span>
                            </label>
                            <input
                                id="password"
                                type="password"
                                on:input=move |ev| set_password.set(event_target_value(&ev))
                                prop:value=password
                                class="input input-bordered"
                                required
                            />
                            <label class="label">
                                <Link to="/reset" class="label-text-alt link link-hover">"Forgot password?"</Link>
                            </label>
                        </div>
                        <div class="form-control mt-6">
                            <button class="btn btn-primary" disabled=move || is_submitting.get()>
                                {move || if is_submitting.get() {
                                    view! { <span class="loading loading-spinner"></span> "Signing in..." }.into_any()
                                } else {
                                    "Sign in".into_any()
                                }}
                            </button>
                        </div>
                        <div class="divider">"or"</div>
                        <button type="button" class="btn btn-outline" on:click=on_google>
                            "Continue with Google"
                        </button>
                        <p class="text-sm text-center mt-2">
                            "No account? "
                            <Link to="/register" class="link link-primary">"Register"</Link>
                        </p>
                    </form>
                </div>
            </div>
        </div>
    }
}
