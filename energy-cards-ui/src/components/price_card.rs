//! Price Card Layout
//!
//! Controls, summary, chart canvas and error area bound to the card view.

use energy_cards::config::EnergyType;
use energy_cards::price_card::CardView;
use leptos::*;

use super::chart::CANVAS_ID;
use super::loading::Loading;

pub const CARD_STYLE: &str = r#"
.card-content { padding: 16px; }
.controls { display: flex; gap: 8px; margin-bottom: 16px; }
.summary { margin-bottom: 16px; }
.chart-container { position: relative; width: 100%; }
.chart-container canvas { width: 100%; height: 300px; }
.error { color: var(--error-color, #db4437); margin-top: 8px; }
.loading { display: flex; align-items: center; gap: 8px; }
.loading-spinner {
  width: 16px; height: 16px; border-radius: 50%;
  border: 2px solid var(--divider-color, #e0e0e0);
  border-top-color: var(--primary-color, #03a9f4);
  animation: spin 1s linear infinite;
}
@keyframes spin { to { transform: rotate(360deg); } }
"#;

/// Static layout of the price card; regions follow `view`
#[component]
pub fn PriceCardLayout(
    view: RwSignal<Option<CardView>>,
    on_type: Callback<EnergyType>,
    on_date: Callback<String>,
    on_update: Callback<()>,
) -> impl IntoView {
    let title = move || view.with(|v| v.as_ref().map(|v| v.title.clone()).unwrap_or_default());
    let loading = move || view.with(|v| v.as_ref().map(|v| v.loading).unwrap_or(false));
    let summary = move || view.with(|v| v.as_ref().and_then(|v| v.summary.clone()));
    let error = move || view.with(|v| v.as_ref().and_then(|v| v.error.clone()));

    let type_options = move || {
        view.with(|v| match v {
            Some(v) => v
                .energy_types
                .iter()
                .map(|energy| {
                    let selected = *energy == v.selected_type;
                    view! { <option value=energy.as_str() selected=selected>{energy.label()}</option> }
                })
                .collect_view(),
            None => ().into_view(),
        })
    };

    let date_options = move || {
        view.with(|v| match v {
            Some(v) => v
                .dates
                .iter()
                .map(|date| {
                    let selected = v.selected_date.as_ref() == Some(date);
                    view! { <option value=date.clone() selected=selected>{date.clone()}</option> }
                })
                .collect_view(),
            None => ().into_view(),
        })
    };

    view! {
        <style>{CARD_STYLE}</style>
        <ha-card header=title>
            <div class="card-content">
                <div class="controls">
                    <select
                        id="energy-type"
                        on:change:undelegated=move |ev| {
                            if let Ok(energy) = event_target_value(&ev).parse::<EnergyType>() {
                                on_type.call(energy);
                            }
                        }
                    >
                        {type_options}
                    </select>
                    <select id="date-select" on:change:undelegated=move |ev| on_date.call(event_target_value(&ev))>
                        {date_options}
                    </select>
                    <button id="update-button" on:click:undelegated=move |_| on_update.call(())>"Update"</button>
                </div>

                <Show when=loading>
                    <Loading />
                </Show>

                <div class="summary" style:display=move || if summary().is_some() { "block" } else { "none" }>
                    {move || summary().unwrap_or_default()}
                </div>

                <div class="chart-container">
                    <canvas id=CANVAS_ID width="800" height="400" />
                </div>

                <div class="error" style:display=move || if error().is_some() { "block" } else { "none" }>
                    {move || error().unwrap_or_default()}
                </div>
            </div>
        </ha-card>
    }
}
