use leptos::prelude::*;
use leptos::task::spawn_local;
use receiptpal::receipts::{self, ReceiptUpload};
use receiptpal_shared::Receipt;

use crate::auth::use_auth;
use crate::components::alert::ErrorAlert;
use crate::web::{first_file, read_file};

#[component]
pub fn UploadPage() -> impl IntoView {
    let auth = use_auth();

    let selected = StoredValue::new_local(None::<web_sys::File>);
    let (file_name, set_file_name) = signal(Option::<String>::None);
    let (receipt, set_receipt) = signal(Option::<Receipt>::None);
    let (is_uploading, set_is_uploading) = signal(false);
    let (error_msg, set_error_msg) = signal(Option::<String>::None);

    let on_pick = move |ev: leptos::web_sys::Event| {
        let file = first_file(&ev);
        set_file_name.set(file.as_ref().map(|f| f.name()));
        selected.set_value(file);
        set_receipt.set(None);
        set_error_msg.set(None);
    };

    let on_submit = move |ev: leptos::web_sys::SubmitEvent| {
        ev.prevent_default();
        let Some(file) = selected.get_value() else {
            set_error_msg.set(Some("Please choose a receipt image.".to_string()));
            return;
        };
        set_is_uploading.set(true);
        set_error_msg.set(None);

        spawn_local(async move {
            let services = auth.services();
            let result = match read_file(&file).await {
                Ok(picked) => {
                    let upload = ReceiptUpload {
                        file_name: picked.name,
                        content_type: picked.content_type,
                        bytes: picked.bytes,
                    };
                    receipts::analyze(&services.auth, &services.cache, &services.api, upload).await
                }
                Err(e) => Err(e),
            };
            match result {
                Ok(parsed) => set_receipt.set(Some(parsed)),
                Err(e) => set_error_msg.set(Some(e.user_message())),
            }
            set_is_uploading.set(false);
        });
    };

    view! {
        <div class="max-w-3xl mx-auto p-4 space-y-6">
            <h1 class="text-2xl font-bold">"Upload a receipt"</h1>
            <form class="card bg-base-100 shadow card-body" on:submit=on_submit>
                <ErrorAlert message=error_msg />
                <input type="file" accept="image/*" class="file-input file-input-bordered" on:change=on_pick />
                <p class="text-sm text-base-content/70">{move || file_name.get().unwrap_or_default()}</p>
                <button class="btn btn-primary" disabled=move || is_uploading.get()>
                    {move || if is_uploading.get() {
                        view! { <span class="loading loading-spinner"></span> "Analyzing..." }.into_any()
                    } else {
                        "Analyze receipt".into_any()
                    }}
                </button>
            </form>

            {move || receipt.get().map(|r| view! { <ReceiptCard receipt=r /> })}
        </div>
    }
}

#[component]
fn ReceiptCard(receipt: Receipt) -> impl IntoView {
    let rows = receipt
        .items
        .iter()
        .map(|item| {
            let qty = item.qty.map(|q| q.to_string()).unwrap_or_default();
            let unit = receipt.format_money(item.unit_price);
            let price = receipt.format_money(item.price);
            view! {
                <tr>
                    <td>{item.name.clone()}</td>
                    <td class="text-right">{qty}</td>
                    <td class="text-right">{unit}</td>
                    <td class="text-right">{price}</td>
                </tr>
            }
        })
        .collect_view();

    view! {
        <div class="card bg-base-100 shadow card-body">
            <h2 class="card-title">{receipt.vendor.clone().unwrap_or_else(|| "Unknown vendor".to_string())}</h2>
            <p class="text-sm">{receipt.date.clone().unwrap_or_default()}</p>
            <table class="table">
                <thead>
                    <tr><th>"Item"</th><th class="text-right">"Qty"</th><th class="text-right">"Unit"</th><th class="text-right">"Price"</th></tr>
                </thead>
                <tbody>{rows}</tbody>
            </table>
            <div class="text-right space-y-1">
                <p>"Subtotal: " {receipt.format_money(receipt.effective_subtotal())}</p>
                <p>"Tax: " {receipt.format_money(receipt.tax)}</p>
                <p class="font-bold">"Total: " {receipt.format_money(receipt.effective_total())}</p>
            </div>
        </div>
    }
}
