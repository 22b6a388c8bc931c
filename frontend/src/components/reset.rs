use leptos::prelude::*;
use leptos::task::spawn_local;
use receiptpal::account::{self, ResetForm};
use receiptpal::route::AppRoute;

use crate::auth::use_auth;
use crate::components::alert::{ErrorAlert, NoticeAlert};
use crate::components::field::TextField;
use crate::web::router::use_router;

/// 找回密码：先请求验证码，再提交新密码
#[component]
pub fn ResetPage() -> impl IntoView {
    let auth = use_auth();
    let router = use_router();

    let email = RwSignal::new(String::new());
    let code = RwSignal::new(String::new());
    let password = RwSignal::new(String::new());
    let confirm_password = RwSignal::new(String::new());
    let (code_sent, set_code_sent) = signal(false);
    let (is_submitting, set_is_submitting) = signal(false);
    let (error_msg, set_error_msg) = signal(Option::<String>::None);
    let (notice, set_notice) = signal(Option::<String>::None);

    let on_request = move |ev: leptos::web_sys::SubmitEvent| {
        ev.prevent_default();
        set_is_submitting.set(true);
        set_error_msg.set(None);

        let address = email.get();
        spawn_local(async move {
            let services = auth.services();
            match account::request_password_reset(&services.auth, &address).await {
                Ok(sent_to) => {
                    set_notice.set(Some(format!("A reset code was sent to {sent_to}.")));
                    set_code_sent.set(true);
                }
                Err(e) => set_error_msg.set(Some(e.user_message())),
            }
            set_is_submitting.set(false);
        });
    };

    let on_confirm = move |ev: leptos::web_sys::SubmitEvent| {
        ev.prevent_default();
        set_is_submitting.set(true);
        set_error_msg.set(None);

        let form = ResetForm {
            email: email.get(),
            code: code.get(),
            password: password.get(),
            confirm_password: confirm_password.get(),
        };
        spawn_local(async move {
            let services = auth.services();
            match account::confirm_password_reset(&services.auth, &form).await {
                Ok(()) => router.navigate(AppRoute::Login.to_path()),
                Err(e) => set_error_msg.set(Some(e.user_message())),
            }
            set_is_submitting.set(false);
        });
    };

    view! {
        <div class="hero min-h-[80vh] bg-base-200">
            <div class="hero-content flex-col w-full max-w-md">
                <h1 class="text-3xl font-bold">"Reset your password"</h1>
                <div class="card shrink-0 w-full shadow-2xl bg-base-100">
                    <Show
                        when=move || code_sent.get()
                        fallback=move || view! {
                            <form class="card-body" on:submit=on_request>
                                <ErrorAlert message=error_msg />
                                <TextField id="email" label="Email" kind="email" value=email />
                                <button class="btn btn-primary mt-6" disabled=move || is_submitting.get()>
                                    "Send reset code"
                                </button>
                            </form>
                        }
                    >
                        <form class="card-body" on:submit=on_confirm>
                            <NoticeAlert message=notice />
                            <ErrorAlert message=error_msg />
                            <TextField id="code" label="Verification code" value=code />
                            <TextField id="password" label="New password" kind="password" value=password />
                            <TextField id="confirm" label="Confirm new password" kind="password" value=confirm_password />
                            <button class="btn btn-primary mt-6" disabled=move || is_submitting.get()>
                                "Set new password"
                            </button>
                        </form>
                    </Show>
                </div>
            </div>
        </div>
    }
}
