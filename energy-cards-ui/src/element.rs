//! Custom element glue
//!
//! Each card tag is a thin `HTMLElement` subclass that forwards the Lovelace
//! card contract (`setConfig`, `hass`, `getCardSize`) to an exported Rust
//! object owning the card.

use energy_cards::config::EnergyType;
use energy_cards::price_card::{CardView, PriceCard, RefreshOutcome};
use energy_cards::registry::{CardRegistry, PRICE_CARD, SENSOR_PANEL};
use energy_cards::sensor_panel::SensorPanel;
use leptos::*;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::fmt::Display;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Event, HtmlElement, HtmlSelectElement, ShadowRoot};

use crate::api::FetchPriceApi;
use crate::components::{CanvasChart, PriceCardLayout};
use crate::host::HassHost;

#[wasm_bindgen(inline_js = r#"
export function define_card(tag, factory) {
  if (customElements.get(tag)) return;
  customElements.define(tag, class extends HTMLElement {
    constructor() {
      super();
      this._card = factory(this.attachShadow({ mode: "open" }));
    }
    setConfig(config) { this._card.set_config(config); }
    set hass(hass) { this._hass = hass; this._card.set_hass(hass); }
    get hass() { return this._hass; }
    getCardSize() { return this._card.card_size(); }
  });
}

export function publish_card(descriptor) {
  window.customCards = window.customCards || [];
  window.customCards.push(descriptor);
}
"#)]
extern "C" {
    fn define_card(tag: &str, factory: &Closure<dyn Fn(ShadowRoot) -> JsValue>);
    fn publish_card(descriptor: JsValue);
}

/// Define both card elements and announce them to the card picker
pub fn define_cards() {
    let panel = Closure::<dyn Fn(ShadowRoot) -> JsValue>::new(|root: ShadowRoot| {
        JsValue::from(SensorPanelElement::new(root))
    });
    define_card(SENSOR_PANEL.card_type, &panel);
    panel.forget();

    let prices = Closure::<dyn Fn(ShadowRoot) -> JsValue>::new(|root: ShadowRoot| {
        JsValue::from(PriceCardElement::new(root))
    });
    define_card(PRICE_CARD.card_type, &prices);
    prices.forget();

    for descriptor in CardRegistry::with_builtin().descriptors() {
        let published = serde_json::to_string(descriptor)
            .map_err(|e| JsValue::from_str(&e.to_string()))
            .and_then(|json| js_sys::JSON::parse(&json));
        match published {
            Ok(value) => publish_card(value),
            Err(e) => tracing::error!(card = descriptor.card_type, error = ?e, "Failed to publish card"),
        }
    }
    tracing::info!("Energy cards registered");
}

/// Card configuration object as JSON
fn config_value(config: &JsValue) -> Result<Value, JsValue> {
    let text: String = js_sys::JSON::stringify(config)?.into();
    serde_json::from_str(&text).map_err(js_error)
}

fn js_error(error: impl Display) -> JsValue {
    js_sys::Error::new(&error.to_string()).into()
}

struct PanelBinding {
    root: ShadowRoot,
    host: Rc<HassHost>,
    panel: SensorPanel,
    listener: RefCell<Option<Closure<dyn FnMut(Event)>>>,
}

/// `ha-energy-panel`
#[wasm_bindgen]
pub struct SensorPanelElement {
    inner: Rc<PanelBinding>,
}

impl SensorPanelElement {
    fn new(root: ShadowRoot) -> Self {
        let host = Rc::new(HassHost::new());
        let inner = Rc::new(PanelBinding {
            root,
            panel: SensorPanel::new(host.clone()),
            host,
            listener: RefCell::new(None),
        });

        // The panel re-renders its markup, so listen on the shadow root
        let weak = Rc::downgrade(&inner);
        let listener = Closure::<dyn FnMut(Event)>::new(move |ev: Event| {
            let Some(binding) = weak.upgrade() else {
                return;
            };
            let Some(select) = ev
                .target()
                .and_then(|t| t.dyn_into::<HtmlSelectElement>().ok())
            else {
                return;
            };
            if select.id() != "date-select" {
                return;
            }

            let date = select.value();
            spawn_local(async move {
                if let Err(e) = binding.panel.select_date(&date).await {
                    tracing::error!(date = %date, error = %e, "Failed to select date");
                }
            });
        });
        if inner
            .root
            .add_event_listener_with_callback("change", listener.as_ref().unchecked_ref())
            .is_err()
        {
            tracing::error!("Failed to attach date listener");
        }
        *inner.listener.borrow_mut() = Some(listener);

        Self { inner }
    }
}

#[wasm_bindgen]
impl SensorPanelElement {
    pub fn set_config(&self, config: JsValue) -> Result<(), JsValue> {
        let value = config_value(&config)?;
        self.inner.panel.set_config(&value).map_err(js_error)
    }

    pub fn set_hass(&self, hass: JsValue) {
        self.inner.host.replace(hass);
        match self.inner.panel.update() {
            Ok(view) => self.inner.root.set_inner_html(&view.to_html()),
            Err(e) => tracing::warn!(error = %e, "Energy panel not rendered"),
        }
    }

    pub fn card_size(&self) -> u32 {
        self.inner.panel.card_size()
    }
}

struct PriceBinding {
    root: ShadowRoot,
    api: Rc<FetchPriceApi>,
    card: PriceCard,
    view: RwSignal<Option<CardView>>,
    mounted: Cell<bool>,
}

impl PriceBinding {
    fn apply<E: Display>(&self, change: impl FnOnce(&PriceCard) -> Result<(), E>) {
        if let Err(e) = change(&self.card) {
            tracing::warn!(error = %e, "Control change rejected");
        }
    }

    fn spawn_refresh(self: Rc<Self>) {
        spawn_local(async move {
            if let RefreshOutcome::Failed(e) = self.card.refresh().await {
                tracing::warn!(error = %e, "Price refresh failed");
            }
        });
    }

    /// Mount the static layout into the shadow root
    fn mount(self: &Rc<Self>) -> Result<(), JsValue> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| JsValue::from_str("document unavailable"))?;
        let container: HtmlElement = document.create_element("div")?.dyn_into()?;
        self.root.append_child(&container)?;

        let view = self.view;
        let weak = Rc::downgrade(self);
        mount_to(container, move || {
            let on_type = Callback::new({
                let weak = weak.clone();
                move |energy: EnergyType| {
                    if let Some(binding) = weak.upgrade() {
                        binding.apply(|card| card.select_type(energy));
                    }
                }
            });
            let on_date = Callback::new({
                let weak = weak.clone();
                move |date: String| {
                    if let Some(binding) = weak.upgrade() {
                        binding.apply(|card| card.select_date(&date));
                    }
                }
            });
            let on_update = Callback::new(move |_| {
                if let Some(binding) = weak.upgrade() {
                    binding.spawn_refresh();
                }
            });

            view! { <PriceCardLayout view=view on_type=on_type on_date=on_date on_update=on_update /> }
        });

        self.mounted.set(true);
        Ok(())
    }
}

/// `energy-prices-card`
#[wasm_bindgen]
pub struct PriceCardElement {
    inner: Rc<PriceBinding>,
}

impl PriceCardElement {
    fn new(root: ShadowRoot) -> Self {
        let api = Rc::new(FetchPriceApi::new());
        let charts = Rc::new(CanvasChart::new(root.clone()));
        // Every change the card makes to its view, loading included, lands in the signal
        let view = create_rw_signal(None);
        let card = PriceCard::new(api.clone(), Some(charts))
            .with_observer(move |current: &CardView| view.set(Some(current.clone())));
        let inner = Rc::new(PriceBinding {
            root,
            card,
            api,
            view,
            mounted: Cell::new(false),
        });
        Self { inner }
    }
}

#[wasm_bindgen]
impl PriceCardElement {
    pub fn set_config(&self, config: JsValue) -> Result<(), JsValue> {
        let value = config_value(&config)?;
        self.inner.card.set_config(&value).map_err(js_error)?;
        if let Some(config) = self.inner.card.config() {
            self.inner.api.set_base_url(&config.api_url);
        }
        Ok(())
    }

    /// Only the first host update sets the card up
    pub fn set_hass(&self, _hass: JsValue) -> Result<(), JsValue> {
        if self.inner.card.is_initialized() {
            return Ok(());
        }
        if !self.inner.mounted.get() {
            self.inner.mount()?;
        }

        let binding = self.inner.clone();
        spawn_local(async move {
            if let Err(e) = binding.card.on_host_update().await {
                tracing::error!(error = %e, "Price card setup failed");
            }
        });
        Ok(())
    }

    pub fn card_size(&self) -> u32 {
        self.inner.card.card_size()
    }
}
