//! Loading Component

use leptos::*;

/// Inline loading indicator shown while prices are fetched
#[component]
pub fn Loading() -> impl IntoView {
    view! {
        <div class="loading">
            <div class="loading-spinner" />
            <span>"Loading..."</span>
        </div>
    }
}
