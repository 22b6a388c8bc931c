use leptos::prelude::*;
use leptos::task::spawn_local;
use receiptpal::account::{self, RegisterForm, RegisterOutcome};
use receiptpal::route::AppRoute;

use crate::auth::use_auth;
use crate::components::alert::ErrorAlert;
use crate::components::field::TextField;
use crate::web::router::{Link, use_router};

#[component]
pub fn RegisterPage() -> impl IntoView {
    let auth = use_auth();
    let router = use_router();

    let email = RwSignal::new(String::new());
    let password = RwSignal::new(String::new());
    let confirm_password = RwSignal::new(String::new());
    let (is_submitting, set_is_submitting) = signal(false);
    let (error_msg, set_error_msg) = signal(Option::<String>::None);

    let on_submit = move |ev: leptos::web_sys::SubmitEvent| {
        ev.prevent_default();
        set_is_submitting.set(true);
        set_error_msg.set(None);

        let form = RegisterForm {
            email: email.get(),
            password: password.get(),
            confirm_password: confirm_password.get(),
        };
        spawn_local(async move {
            let services = auth.services();
            match account::register(&services.auth, &services.cache, &form).await {
                Ok(RegisterOutcome::VerificationRequired { .. }) => {
                    router.navigate(AppRoute::Confirm.to_path());
                }
                Ok(RegisterOutcome::SignedIn(_)) => {
                    auth.refresh_identity();
                    router.navigate(AppRoute::auth_success_redirect().to_path());
                }
                Err(e) => set_error_msg.set(Some(e.user_message())),
            }
            set_is_submitting.set(false);
        });
    };

    view! {
        <div class="hero min-h-[80vh] bg-base-200">
            <div class="hero-content flex-col w-full max-w-md">
                <h1 class="text-3xl font-bold">"Create your account"</h1>
                <div class="card shrink-0 w-full shadow-2xl bg-base-100">
                    <form class="card-body" on:submit=on_submit>
                        <ErrorAlert message=error_msg />
                        <TextField id="email" label="Email" kind="email" value=email />
                        <TextField id="password" label="Password" kind="password" value=password />
                        <TextField id="confirm" label="Confirm password" kind="password" value=confirm_password />
                        <div class="form-control mt-6">
                            <button class="btn btn-primary" disabled=move || is_submitting.get()>
                                "Register"
                            </button>
                        </div>
                        <p class="text-sm text-center mt-2">
                            "Already registered? "
                            <Link to="/login" class="link link-primary">"Sign in"</Link>
                        </p>
                    </form>
                </div>
            </div>
        </div>
    }
}
