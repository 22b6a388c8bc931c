use leptos::prelude::*;
use leptos::task::spawn_local;
use receiptpal::account::{self, AvatarFile, EmailChangeStep, ProfileForm};
use receiptpal::route::AppRoute;
use receiptpal_shared::Preferences;

use crate::auth::use_auth;
use crate::components::alert::{ErrorAlert, NoticeAlert};
use crate::components::field::TextField;
use crate::web::router::use_router;
use crate::web::{PickedFile, first_file, read_file};

#[component]
pub fn SettingsPage() -> impl IntoView {
    let auth = use_auth();
    let router = use_router();

    let (loading, set_loading) = signal(true);
    let (prefs, set_prefs) = signal(Preferences::default());
    let first_name = RwSignal::new(String::new());
    let last_name = RwSignal::new(String::new());
    let new_email = RwSignal::new(String::new());
    let email_code = RwSignal::new(String::new());
    let (pending_email, set_pending_email) = signal(Option::<String>::None);
    let avatar = StoredValue::new_local(None::<PickedFile>);
    let (is_saving, set_is_saving) = signal(false);
    let (error_msg, set_error_msg) = signal(Option::<String>::None);
    let (notice, set_notice) = signal(Option::<String>::None);

    spawn_local(async move {
        let services = auth.services();
        match account::load_settings(&services.auth, &services.api).await {
            Ok(loaded) => {
                first_name.set(loaded.profile.first_name.clone());
                last_name.set(loaded.profile.last_name.clone());
                new_email.set(loaded.profile.email.clone());
                set_prefs.set(loaded);
            }
            Err(e) if e.is_silent() => router.navigate(AppRoute::auth_failure_redirect().to_path()),
            Err(e) => set_error_msg.set(Some(e.user_message())),
        }
        set_loading.set(false);
    });

    let on_pick_avatar = move |ev: leptos::web_sys::Event| {
        let Some(file) = first_file(&ev) else {
            return;
        };
        spawn_local(async move {
            match read_file(&file).await {
                Ok(picked) => avatar.set_value(Some(picked)),
                Err(e) => set_error_msg.set(Some(e.user_message())),
            }
        });
    };

    let on_save_profile = move |ev: leptos::web_sys::SubmitEvent| {
        ev.prevent_default();
        set_is_saving.set(true);
        set_error_msg.set(None);
        set_notice.set(None);

        let form = ProfileForm {
            first_name: first_name.get(),
            last_name: last_name.get(),
            avatar_url: prefs.with(|p| p.profile.avatar_url.clone().unwrap_or_default()),
        };
        let file = avatar.with_value(|picked| {
            picked.as_ref().map(|p| AvatarFile {
                name: p.name.clone(),
                content_type: p.content_type.clone(),
                bytes: p.bytes.clone(),
            })
        });
        spawn_local(async move {
            let services = auth.services();
            let saved =
                account::save_profile(&services.auth, &services.api, &services.cache, &form, file)
                    .await;
            match saved {
                Ok(saved) => {
                    set_prefs.update(|p| p.profile.avatar_url = saved.avatar_url.clone());
                    avatar.set_value(None);
                    auth.refresh_identity();
                    set_notice.set(Some("Profile saved.".to_string()));
                }
                Err(e) => set_error_msg.set(Some(e.user_message())),
            }
            set_is_saving.set(false);
        });
    };

    let on_change_email = move |ev: leptos::web_sys::SubmitEvent| {
        ev.prevent_default();
        set_error_msg.set(None);
        set_notice.set(None);

        let current = prefs.with(|p| p.profile.email.clone());
        let requested = new_email.get();
        spawn_local(async move {
            let services = auth.services();
            match account::start_email_change(&services.auth, &current, &requested).await {
                Ok(EmailChangeStep::Unchanged) => {}
                Ok(EmailChangeStep::CodeSent { email }) => {
                    set_notice.set(Some(format!("A verification code was sent to {email}.")));
                    set_pending_email.set(Some(email));
                }
                Err(e) => set_error_msg.set(Some(e.user_message())),
            }
        });
    };

    let on_confirm_email = move |ev: leptos::web_sys::SubmitEvent| {
        ev.prevent_default();
        set_error_msg.set(None);

        let code = email_code.get();
        let requested = pending_email.get().unwrap_or_default();
        spawn_local(async move {
            let services = auth.services();
            let confirmed = account::confirm_email_change(
                &services.auth,
                &services.api,
                &services.cache,
                &code,
                &requested,
            )
            .await;
            match confirmed {
                Ok(email) => {
                    set_prefs.update(|p| {
                        p.profile.email = email.clone();
                        p.profile.email_verified = true;
                    });
                    set_pending_email.set(None);
                    email_code.set(String::new());
                    auth.refresh_identity();
                    set_notice.set(Some("Email updated.".to_string()));
                }
                Err(e) => set_error_msg.set(Some(e.user_message())),
            }
        });
    };

    view! {
        <div class="max-w-2xl mx-auto p-4 space-y-6">
            <h1 class="text-2xl font-bold">"Account settings"</h1>
            <ErrorAlert message=error_msg />
            <NoticeAlert message=notice />

            <Show when=move || !loading.get() fallback=|| view! { <span class="loading loading-spinner loading-lg"></span> }>
                <form class="card bg-base-100 shadow card-body" on:submit=on_save_profile>
                    <h2 class="card-title">"Profile"</h2>
                    <div class="flex items-center gap-4">
                        {move || prefs.with(|p| p.profile.avatar_url.clone()).map(|url| view! {
                            <img class="w-16 h-16 rounded-full" src=url alt="Avatar" />
                        })}
                        <input type="file" accept="image/*" class="file-input file-input-bordered" on:change=on_pick_avatar />
                    </div>
                    <TextField id="first-name" label="First name" value=first_name />
                    <TextField id="last-name" label="Last name" value=last_name />
                    <button class="btn btn-primary mt-4" disabled=move || is_saving.get()>"Save profile"</button>
                </form>

                <div class="card bg-base-100 shadow card-body">
                    <h2 class="card-title">"Email"</h2>
                    <p class="text-sm">
                        {move || prefs.with(|p| p.profile.email.clone())}
                        {move || if prefs.with(|p| p.profile.email_verified) {
                            view! { <span class="badge badge-success ml-2">"verified"</span> }.into_any()
                        } else {
                            view! { <span class="badge badge-warning ml-2">"unverified"</span> }.into_any()
                        }}
                    </p>
                    <Show
                        when=move || pending_email.get().is_some()
                        fallback=move || view! {
                            <form on:submit=on_change_email>
                                <TextField id="new-email" label="New email" kind="email" value=new_email />
                                <button class="btn btn-outline mt-4">"Send verification code"</button>
                            </form>
                        }
                    >
                        <form on:submit=on_confirm_email>
                            <TextField id="email-code" label="Verification code" value=email_code />
                            <button class="btn btn-primary mt-4">"Confirm new email"</button>
                        </form>
                    </Show>
                </div>
            </Show>
        </div>
    }
}
