use leptos::prelude::*;
use leptos::task::spawn_local;
use receiptpal::account;
use receiptpal::identity::IdentityCache;
use receiptpal::route::AppRoute;

use crate::auth::use_auth;
use crate::components::alert::ErrorAlert;
use crate::components::field::TextField;
use crate::web::router::use_router;

/// 注册后的邮件验证码确认
#[component]
pub fn ConfirmPage() -> impl IntoView {
    let auth = use_auth();
    let router = use_router();

    let pending = auth.services().cache.pending_verification().unwrap_or_default();
    let email = RwSignal::new(pending);
    let code = RwSignal::new(String::new());
    let (is_submitting, set_is_submitting) = signal(false);
    let (error_msg, set_error_msg) = signal(Option::<String>::None);

    let on_submit = move |ev: leptos::web_sys::SubmitEvent| {
        ev.prevent_default();
        set_is_submitting.set(true);
        set_error_msg.set(None);

        let (email, code) = (email.get(), code.get());
        spawn_local(async move {
            let services = auth.services();
            let confirmed =
                account::confirm_registration(&services.auth, &services.cache, &email, &code).await;
            match confirmed {
                Ok(()) => router.navigate(AppRoute::Login.to_path()),
                Err(e) => set_error_msg.set(Some(e.user_message())),
            }
            set_is_submitting.set(false);
        });
    };

    view! {
        <div class="hero min-h-[80vh] bg-base-200">
            <div class="hero-content flex-col w-full max-w-md">
                <h1 class="text-3xl font-bold">"Verify your email"</h1>
                <p class="text-base-content/70">"We sent a verification code to your inbox."</p>
                <div class="card shrink-0 w-full shadow-2xl bg-base-100">
                    <form class="card-body" on:submit=on_submit>
                        <ErrorAlert message=error_msg />
                        <TextField id="email" label="Email" kind="email" value=email />
                        <TextField id="code" label="Verification code" value=code />
                        <div class="form-control mt-6">
                            <button class="btn btn-primary" disabled=move || is_submitting.get()>
                                "Confirm"
                            </button>
                        </div>
                    </form>
                </div>
            </div>
        </div>
    }
}
