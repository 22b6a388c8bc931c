use leptos::prelude::*;
use leptos::task::spawn_local;
use receiptpal::receipts;
use receiptpal_shared::receipt::currency_prefix;
use receiptpal_shared::expenses::{SummaryBody, format_delta};

use crate::auth::use_auth;
use crate::components::alert::ErrorAlert;

fn money(value: f64) -> String {
    format!("{}{:.2}", currency_prefix(Some("SGD")), value)
}

#[component]
pub fn ExpensesPage() -> impl IntoView {
    let auth = use_auth();

    let (summary, set_summary) = signal(Option::<SummaryBody>::None);
    let (error_msg, set_error_msg) = signal(Option::<String>::None);

    spawn_local(async move {
        let services = auth.services();
        match receipts::load_expenses(&services.cache, &services.api).await {
            Ok(loaded) => set_summary.set(Some(loaded.summary)),
            Err(e) => set_error_msg.set(Some(e.user_message())),
        }
    });

    view! {
        <div class="max-w-5xl mx-auto p-4 space-y-6">
            <h1 class="text-2xl font-bold">"Expenses"</h1>
            <ErrorAlert message=error_msg />
            {move || summary.get().map(|s| view! { <SummaryView summary=s /> })}
        </div>
    }
}

#[component]
fn SummaryView(summary: SummaryBody) -> impl IntoView {
    let periods = summary.periods.clone().unwrap_or_default();
    let top = summary
        .top_category()
        .map(|c| format!("{} ({})", c.name(), money(c.total)))
        .unwrap_or_else(|| "—".to_string());

    let monthly = summary
        .monthly
        .iter()
        .map(|m| view! { <li>{m.label()} ": " {money(m.total)}</li> })
        .collect_view();
    let categories = summary
        .breakdown_by_category
        .iter()
        .map(|c| view! { <li>{c.name().to_string()} ": " {money(c.total)}</li> })
        .collect_view();
    let transactions = summary
        .recent_transactions
        .iter()
        .map(|t| {
            let badge = t
                .needs_review()
                .then(|| view! { <span class="badge badge-warning ml-2">"review"</span> });
            view! {
                <tr>
                    <td>{t.date.clone().unwrap_or_default()}</td>
                    <td>{t.vendor.clone().unwrap_or_default()}</td>
                    <td>{t.category.clone().unwrap_or_default()} {badge}</td>
                    <td class="text-right">{money(t.total)}</td>
                </tr>
            }
        })
        .collect_view();

    view! {
        <div class="stats shadow w-full">
            <div class="stat">
                <div class="stat-title">"This month"</div>
                <div class="stat-value">{money(summary.total_this_month)}</div>
                <div class="stat-desc">{format_delta(periods.month_delta_pct, "month")}</div>
            </div>
            <div class="stat">
                <div class="stat-title">"This week"</div>
                <div class="stat-value">{summary.total_this_week.map(money).unwrap_or_else(|| "—".to_string())}</div>
                <div class="stat-desc">{format_delta(periods.week_delta_pct, "week")}</div>
            </div>
            <div class="stat">
                <div class="stat-title">"All time"</div>
                <div class="stat-value">{money(summary.total_all_time)}</div>
                <div class="stat-desc">"Top: " {top}</div>
            </div>
            <div class="stat">
                <div class="stat-title">"Needs review"</div>
                <div class="stat-value">{summary.needs_review_count}</div>
            </div>
        </div>

        <div class="grid md:grid-cols-2 gap-4">
            <div class="card bg-base-100 shadow card-body">
                <h2 class="card-title">"Monthly"</h2>
                <ul>{monthly}</ul>
            </div>
            <div class="card bg-base-100 shadow card-body">
                <h2 class="card-title">"By category"</h2>
                <ul>{categories}</ul>
            </div>
        </div>

        <div class="card bg-base-100 shadow card-body">
            <h2 class="card-title">"Recent transactions"</h2>
            <table class="table">
                <tbody>{transactions}</tbody>
            </table>
        </div>
    }
}
