use leptos::prelude::*;

use crate::web::router::Link;

#[component]
pub fn HomePage() -> impl IntoView {
    view! {
        <div class="hero min-h-[70vh]">
            <div class="hero-content text-center">
                <div class="max-w-md">
                    <h1 class="text-5xl font-bold">"ReceiptPal"</h1>
                    <p class="py-6">"Snap a receipt, get the line items, and see where your money goes."</p>
                    <Link to="/upload" class="btn btn-primary">"Get started"</Link>
                </div>
            </div>
        </div>
    }
}

#[component]
pub fn AboutPage() -> impl IntoView {
    view! {
        <div class="max-w-2xl mx-auto p-4 space-y-4">
            <h1 class="text-2xl font-bold">"About"</h1>
            <p>
                "ReceiptPal reads your receipt images, extracts vendor, items and totals, "
                "and keeps a running summary of your expenses."
            </p>
        </div>
    }
}
