//! API-Bound Energy Price Card
//!
//! Charts the price series of one energy type and day, fetched from the
//! energy price API. The card sets itself up once, on the first host update,
//! and redraws on every refresh.
//!
//! ## Refresh ordering
//!
//! Every refresh takes a generation ticket before it starts fetching. When
//! the fetches complete, only the holder of the newest ticket may touch the
//! view or the chart; older refreshes are reported as
//! [`RefreshOutcome::Superseded`] and dropped.

pub mod api;
pub mod chart;
mod view;

pub use api::{DaySummary, PriceApi, PriceData, PriceReading, PriceSeries};
pub use chart::{
    bar_color, format_currency, reading_label, Bar, ChartHandle, ChartLibrary, ChartSpec, Rgb,
    NEGATIVE_PRICE_COLOR,
};
pub use view::{recent_dates, CardView, DATE_OPTIONS};

use chrono::NaiveDate;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::config::{ConfigError, EnergyType, PriceCardConfig};
use crate::diagnostics::{DiagnosticSource, Diagnostics};
use crate::error::{CardError, CardResult};

/// Layout hint reported to the dashboard
pub const PRICE_CARD_SIZE: u32 = 6;

/// Result of one refresh
#[derive(Debug)]
pub enum RefreshOutcome {
    /// Chart redrawn with this many bars
    Rendered { bars: usize },
    /// Error area now shows this failure
    Failed(CardError),
    /// A newer refresh started while this one was fetching
    Superseded,
}

#[derive(Default)]
struct CardState {
    initialized: bool,
    library_ready: bool,
    view: Option<CardView>,
    chart: Option<Box<dyn ChartHandle>>,
}

pub struct PriceCard {
    api: Rc<dyn PriceApi>,
    charts: Option<Rc<dyn ChartLibrary>>,
    config: RefCell<Option<PriceCardConfig>>,
    state: RefCell<CardState>,
    generation: Cell<u64>,
    today: Box<dyn Fn() -> NaiveDate>,
    observer: Option<Box<dyn Fn(&CardView)>>,
    diagnostics: Diagnostics,
}

impl PriceCard {
    /// Create a card fetching through `api` and drawing with `charts`
    pub fn new(api: Rc<dyn PriceApi>, charts: Option<Rc<dyn ChartLibrary>>) -> Self {
        Self {
            api,
            charts,
            config: RefCell::new(None),
            state: RefCell::new(CardState::default()),
            generation: Cell::new(0),
            today: Box::new(|| chrono::Local::now().date_naive()),
            observer: None,
            diagnostics: Diagnostics::new(),
        }
    }

    /// Replace the clock used to build the date list
    pub fn with_today(mut self, today: impl Fn() -> NaiveDate + 'static) -> Self {
        self.today = Box::new(today);
        self
    }

    /// Called with the new view whenever what the card shows changes
    pub fn with_observer(mut self, observer: impl Fn(&CardView) + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Validate the configuration and merge it over the defaults
    pub fn set_config(&self, raw: &Value) -> Result<(), ConfigError> {
        let config = PriceCardConfig::from_value(raw)?;
        tracing::info!(api_url = %config.api_url, default_type = %config.default_type, "Price card configured");
        *self.config.borrow_mut() = Some(config);
        Ok(())
    }

    pub fn config(&self) -> Option<PriceCardConfig> {
        self.config.borrow().clone()
    }

    pub fn card_size(&self) -> u32 {
        PRICE_CARD_SIZE
    }

    pub fn is_initialized(&self) -> bool {
        self.state.borrow().initialized
    }

    /// Snapshot of what the card shows
    pub fn view(&self) -> Option<CardView> {
        self.state.borrow().view.clone()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Host state arrived; the first call sets the card up
    ///
    /// Setup builds the layout, loads the chart library, offers the last
    /// seven days and draws the initial chart. A chart library failure is
    /// shown in the error area and returned.
    pub async fn on_host_update(&self) -> CardResult<()> {
        let config = self.current_config()?;
        {
            let mut state = self.state.borrow_mut();
            if state.initialized {
                return Ok(());
            }
            state.initialized = true;
            state.view = Some(CardView::build(&config, (self.today)()));
        }
        tracing::info!(title = %config.title, "Price card set up");
        self.notify();

        if let Err(e) = self.load_library().await {
            tracing::error!(error = %e, "Chart library unavailable");
            if let Some(view) = self.state.borrow_mut().view.as_mut() {
                view.error = Some(e.to_string());
            }
            self.notify();
            return Err(e);
        }

        self.refresh().await;
        Ok(())
    }

    async fn load_library(&self) -> CardResult<()> {
        let charts = self
            .charts
            .clone()
            .ok_or_else(|| CardError::ChartLibrary("no chart library provided".to_string()))?;

        charts.ensure_loaded().await?;
        self.state.borrow_mut().library_ready = true;
        Ok(())
    }

    /// Energy type control changed
    pub fn select_type(&self, energy: EnergyType) -> CardResult<()> {
        self.with_view(|view| {
            view.selected_type = energy;
            Ok(())
        })?;
        self.notify();
        Ok(())
    }

    /// Date control changed; only offered dates are accepted
    pub fn select_date(&self, date: &str) -> CardResult<()> {
        self.with_view(|view| {
            if !view.dates.iter().any(|d| d == date) {
                return Err(CardError::Selection(format!("date {} is not offered", date)));
            }
            view.selected_date = Some(date.to_string());
            Ok(())
        })?;
        self.notify();
        Ok(())
    }

    /// Fetch the selected series and redraw the chart
    pub async fn refresh(&self) -> RefreshOutcome {
        let ticket = self.generation.get() + 1;
        self.generation.set(ticket);

        let result = match self.begin_refresh() {
            Ok((config, energy, date)) => {
                self.notify();
                self.load(&config, energy, &date).await
            }
            Err(e) => Err(e),
        };

        let latest = self.generation.get();
        if ticket != latest {
            tracing::debug!(ticket, latest, "Discarding superseded refresh");
            return RefreshOutcome::Superseded;
        }

        let result = result.and_then(|(spec, summary)| self.draw(spec, summary));
        let outcome = self.finish(result);
        self.notify();
        outcome
    }

    /// Show loading, hide the old error, read the controls
    fn begin_refresh(&self) -> CardResult<(PriceCardConfig, EnergyType, String)> {
        let config = self.current_config()?;
        let mut state = self.state.borrow_mut();
        let view = state.view.as_mut().ok_or(CardError::NotReady)?;

        view.loading = true;
        view.error = None;

        let date = view
            .selected_date
            .clone()
            .ok_or_else(|| CardError::Selection("no date selected".to_string()))?;

        Ok((config, view.selected_type, date))
    }

    async fn load(
        &self,
        config: &PriceCardConfig,
        energy: EnergyType,
        date: &str,
    ) -> CardResult<(ChartSpec, Option<String>)> {
        let series = self.api.fetch_prices(energy, date).await?;

        let summary = match self.api.fetch_summary(date).await {
            Ok(summary) => summary.message,
            Err(e) => {
                self.diagnostics.record(
                    DiagnosticSource::Summary,
                    &api::summary_url(&config.api_url, date),
                    e.to_string(),
                );
                None
            }
        };

        Ok((
            ChartSpec::from_series(&series, energy, date, &config.currency),
            summary,
        ))
    }

    /// Replace the live chart; the old instance is destroyed first
    fn draw(&self, spec: ChartSpec, summary: Option<String>) -> CardResult<usize> {
        let mut state = self.state.borrow_mut();
        if !state.library_ready {
            return Err(CardError::ChartLibrary("chart library is not loaded".to_string()));
        }
        let charts = self
            .charts
            .as_ref()
            .ok_or_else(|| CardError::ChartLibrary("no chart library provided".to_string()))?;

        if let Some(view) = state.view.as_mut() {
            view.summary = summary;
            view.chart = None;
        }
        if let Some(mut previous) = state.chart.take() {
            previous.destroy();
        }

        let handle = charts.render(&spec)?;
        state.chart = Some(handle);

        let bars = spec.bars.len();
        if let Some(view) = state.view.as_mut() {
            view.chart = Some(spec);
        }
        Ok(bars)
    }

    fn finish(&self, result: CardResult<usize>) -> RefreshOutcome {
        let mut state = self.state.borrow_mut();
        if let Some(view) = state.view.as_mut() {
            view.loading = false;
            if let Err(e) = &result {
                view.error = Some(e.to_string());
            }
        }

        match result {
            Ok(bars) => {
                tracing::info!(bars, "Price chart rendered");
                RefreshOutcome::Rendered { bars }
            }
            Err(e) => {
                tracing::error!(error = %e, "Price chart refresh failed");
                RefreshOutcome::Failed(e)
            }
        }
    }

    fn notify(&self) {
        let Some(observer) = &self.observer else {
            return;
        };
        if let Some(view) = self.view() {
            observer(&view);
        }
    }

    fn with_view<T>(&self, f: impl FnOnce(&mut CardView) -> CardResult<T>) -> CardResult<T> {
        let mut state = self.state.borrow_mut();
        let view = state.view.as_mut().ok_or(CardError::NotReady)?;
        f(view)
    }

    fn current_config(&self) -> CardResult<PriceCardConfig> {
        self.config.borrow().clone().ok_or(CardError::NotConfigured)
    }
}

impl Drop for PriceCard {
    fn drop(&mut self) {
        if let Some(mut chart) = self.state.get_mut().chart.take() {
            chart.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use tokio::sync::Notify;

    /// Price API double serving queued responses
    #[derive(Default)]
    struct FakeApi {
        prices: RefCell<VecDeque<CardResult<PriceSeries>>>,
        summary: RefCell<Option<CardResult<DaySummary>>>,
        /// Gates awaited by the next price fetches, in order
        gates: RefCell<VecDeque<Option<Rc<Notify>>>>,
        requests: RefCell<Vec<(EnergyType, String)>>,
    }

    impl FakeApi {
        fn push_prices(&self, result: CardResult<PriceSeries>) {
            self.prices.borrow_mut().push_back(result);
        }

        fn set_summary(&self, result: CardResult<DaySummary>) {
            *self.summary.borrow_mut() = Some(result);
        }
    }

    #[async_trait(?Send)]
    impl PriceApi for FakeApi {
        async fn fetch_prices(&self, energy: EnergyType, date: &str) -> CardResult<PriceSeries> {
            self.requests.borrow_mut().push((energy, date.to_string()));
            let response = self
                .prices
                .borrow_mut()
                .pop_front()
                .unwrap_or(Err(CardError::HttpStatus(404)));
            let gate = self.gates.borrow_mut().pop_front().flatten();
            if let Some(gate) = gate {
                gate.notified().await;
            }
            response
        }

        async fn fetch_summary(&self, _date: &str) -> CardResult<DaySummary> {
            match self.summary.borrow_mut().take() {
                Some(result) => result,
                None => Ok(DaySummary::default()),
            }
        }
    }

    /// Chart library double counting live instances
    #[derive(Default)]
    struct FakeCharts {
        live: Rc<Cell<usize>>,
        rendered: RefCell<Vec<ChartSpec>>,
        loads: Cell<usize>,
        fail_load: bool,
    }

    struct FakeHandle {
        live: Rc<Cell<usize>>,
    }

    impl ChartHandle for FakeHandle {
        fn destroy(&mut self) {
            self.live.set(self.live.get() - 1);
        }
    }

    #[async_trait(?Send)]
    impl ChartLibrary for FakeCharts {
        async fn ensure_loaded(&self) -> CardResult<()> {
            self.loads.set(self.loads.get() + 1);
            if self.fail_load {
                return Err(CardError::ChartLibrary("failed to load chart.js".to_string()));
            }
            Ok(())
        }

        fn render(&self, spec: &ChartSpec) -> CardResult<Box<dyn ChartHandle>> {
            self.live.set(self.live.get() + 1);
            self.rendered.borrow_mut().push(spec.clone());
            Ok(Box::new(FakeHandle {
                live: self.live.clone(),
            }))
        }
    }

    fn series(prices: &[f64]) -> PriceSeries {
        PriceSeries::new(
            prices
                .iter()
                .enumerate()
                .map(|(hour, price)| PriceReading::new(format!("2024-01-10T{:02}:00:00", hour), *price))
                .collect(),
            0.1,
        )
    }

    fn card(api: &Rc<FakeApi>, charts: Option<&Rc<FakeCharts>>) -> PriceCard {
        let api: Rc<dyn PriceApi> = api.clone();
        let charts = charts.map(|c| -> Rc<dyn ChartLibrary> { c.clone() });
        let card = PriceCard::new(api, charts)
            .with_today(|| NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        card.set_config(&json!({ "api_url": "http://prices.local" }))
            .unwrap();
        card
    }

    #[test]
    fn test_config_requires_api_url() {
        let api: Rc<dyn PriceApi> = Rc::new(FakeApi::default());
        let card = PriceCard::new(api, None);

        assert!(card.set_config(&json!({ "title": "Prices" })).is_err());
        assert!(card.config().is_none());

        card.set_config(&json!({ "api_url": "http://x", "title": "Mine" }))
            .unwrap();
        let config = card.config().unwrap();
        assert_eq!(config.title, "Mine");
        assert_eq!(config.default_type, EnergyType::Power);
        assert_eq!(card.card_size(), PRICE_CARD_SIZE);
    }

    #[tokio::test]
    async fn test_host_update_before_config() {
        let api: Rc<dyn PriceApi> = Rc::new(FakeApi::default());
        let card = PriceCard::new(api, None);
        assert!(matches!(
            card.on_host_update().await,
            Err(CardError::NotConfigured)
        ));
        assert!(!card.is_initialized());
    }

    #[tokio::test]
    async fn test_refresh_before_setup_is_not_ready() {
        let api = Rc::new(FakeApi::default());
        let charts = Rc::new(FakeCharts::default());
        let card = card(&api, Some(&charts));

        let outcome = card.refresh().await;
        match outcome {
            RefreshOutcome::Failed(e) => {
                assert!(matches!(e, CardError::NotReady));
                assert_eq!(e.to_string(), "Card is not set up yet");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(matches!(
            card.select_type(EnergyType::Gas),
            Err(CardError::NotReady)
        ));
        assert!(api.requests.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_observer_sees_layout_and_loading_during_setup() {
        let api = Rc::new(FakeApi::default());
        api.push_prices(Ok(series(&[0.1, 0.2])));
        let charts = Rc::new(FakeCharts::default());
        let seen: Rc<RefCell<Vec<CardView>>> = Rc::default();

        let card = {
            let seen = seen.clone();
            let api: Rc<dyn PriceApi> = api.clone();
            let charts: Rc<dyn ChartLibrary> = charts.clone();
            PriceCard::new(api, Some(charts))
                .with_today(|| NaiveDate::from_ymd_opt(2024, 1, 10).unwrap())
                .with_observer(move |view| seen.borrow_mut().push(view.clone()))
        };
        card.set_config(&json!({ "api_url": "http://prices.local" }))
            .unwrap();
        card.on_host_update().await.unwrap();

        let seen = seen.borrow();
        let loading: Vec<bool> = seen.iter().map(|v| v.loading).collect();
        assert_eq!(loading, vec![false, true, false]);
        assert_eq!(seen[0].dates.len(), DATE_OPTIONS);
        assert_eq!(seen[0].title, "Energy Prices");
        assert!(seen[1].chart.is_none());
        assert_eq!(seen[2].chart.as_ref().unwrap().bars.len(), 2);
    }

    #[tokio::test]
    async fn test_setup_runs_once() {
        let api = Rc::new(FakeApi::default());
        api.push_prices(Ok(series(&[0.1, 0.2])));
        api.set_summary(Ok(DaySummary {
            message: Some("Cheapest at night".to_string()),
        }));
        let charts = Rc::new(FakeCharts::default());
        let card = card(&api, Some(&charts));

        card.on_host_update().await.unwrap();
        card.on_host_update().await.unwrap();

        assert!(card.is_initialized());
        assert_eq!(charts.loads.get(), 1);
        assert_eq!(api.requests.borrow().len(), 1);
        assert_eq!(
            api.requests.borrow()[0],
            (EnergyType::Power, "2024-01-10".to_string())
        );

        let view = card.view().unwrap();
        assert_eq!(view.dates.len(), DATE_OPTIONS);
        assert_eq!(view.dates[0], "2024-01-10");
        assert_eq!(view.summary.as_deref(), Some("Cheapest at night"));
        assert!(!view.loading);
        assert_eq!(view.chart.unwrap().title, "Power Prices - 2024-01-10");
    }

    #[tokio::test]
    async fn test_missing_chart_library_shown() {
        let api = Rc::new(FakeApi::default());
        let card = card(&api, None);

        let result = card.on_host_update().await;
        assert!(matches!(result, Err(CardError::ChartLibrary(_))));

        let view = card.view().unwrap();
        assert!(view.error.unwrap().contains("Chart library"));
        assert!(api.requests.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_chart_library_load_failure() {
        let api = Rc::new(FakeApi::default());
        let charts = Rc::new(FakeCharts {
            fail_load: true,
            ..Default::default()
        });
        let card = card(&api, Some(&charts));

        assert!(card.on_host_update().await.is_err());
        assert!(card.view().unwrap().error.unwrap().contains("chart.js"));

        // A later refresh cannot draw either
        api.push_prices(Ok(series(&[0.1])));
        let outcome = card.refresh().await;
        assert!(matches!(outcome, RefreshOutcome::Failed(CardError::ChartLibrary(_))));
        assert_eq!(charts.live.get(), 0);
    }

    #[tokio::test]
    async fn test_http_error_shown_and_loading_cleared() {
        let api = Rc::new(FakeApi::default());
        api.push_prices(Err(CardError::HttpStatus(500)));
        let charts = Rc::new(FakeCharts::default());
        let card = card(&api, Some(&charts));

        card.on_host_update().await.unwrap();

        let view = card.view().unwrap();
        assert!(!view.loading);
        assert!(view.error.unwrap().contains("500"));
        assert!(view.chart.is_none());

        // Next successful refresh hides the error
        api.push_prices(Ok(series(&[0.3])));
        let outcome = card.refresh().await;
        assert!(matches!(outcome, RefreshOutcome::Rendered { bars: 1 }));
        let view = card.view().unwrap();
        assert!(view.error.is_none());
        assert!(!view.loading);
    }

    #[tokio::test]
    async fn test_summary_failure_is_swallowed() {
        let api = Rc::new(FakeApi::default());
        api.push_prices(Ok(series(&[0.1, 0.4])));
        api.set_summary(Err(CardError::HttpStatus(404)));
        let charts = Rc::new(FakeCharts::default());
        let card = card(&api, Some(&charts));

        card.on_host_update().await.unwrap();

        let view = card.view().unwrap();
        assert!(view.error.is_none());
        assert!(view.summary.is_none());
        assert!(view.chart.is_some());
        assert_eq!(card.diagnostics().count(DiagnosticSource::Summary), 1);
        assert_eq!(
            card.diagnostics().records()[0].subject,
            "http://prices.local/api/energy/summary/2024-01-10"
        );
    }

    #[tokio::test]
    async fn test_repeated_refresh_keeps_one_chart() {
        let api = Rc::new(FakeApi::default());
        let charts = Rc::new(FakeCharts::default());
        let card = card(&api, Some(&charts));

        api.push_prices(Ok(series(&[0.1])));
        card.on_host_update().await.unwrap();

        api.push_prices(Ok(series(&[0.2, 0.3])));
        api.push_prices(Ok(series(&[-0.1, 0.5, 0.4])));
        card.refresh().await;
        card.refresh().await;

        assert_eq!(charts.live.get(), 1);
        assert_eq!(charts.rendered.borrow().len(), 3);
        assert_eq!(card.view().unwrap().chart.unwrap().bars.len(), 3);

        drop(card);
        assert_eq!(charts.live.get(), 0);
    }

    #[tokio::test]
    async fn test_controls_drive_request() {
        let api = Rc::new(FakeApi::default());
        let charts = Rc::new(FakeCharts::default());
        let card = card(&api, Some(&charts));

        api.push_prices(Ok(series(&[0.1])));
        card.on_host_update().await.unwrap();

        card.select_type(EnergyType::Gas).unwrap();
        card.select_date("2024-01-08").unwrap();
        assert!(matches!(
            card.select_date("2023-01-01"),
            Err(CardError::Selection(_))
        ));

        api.push_prices(Ok(series(&[1.2])));
        card.refresh().await;

        assert_eq!(
            api.requests.borrow()[1],
            (EnergyType::Gas, "2024-01-08".to_string())
        );
        assert_eq!(
            card.view().unwrap().chart.unwrap().title,
            "Gas Prices - 2024-01-08"
        );
    }

    #[tokio::test]
    async fn test_stale_refresh_discarded() {
        let api = Rc::new(FakeApi::default());
        let charts = Rc::new(FakeCharts::default());
        let card = card(&api, Some(&charts));

        api.push_prices(Ok(series(&[0.1])));
        card.on_host_update().await.unwrap();

        // First refresh stalls until the second has finished
        let gate = Rc::new(Notify::new());
        api.gates.borrow_mut().push_back(Some(gate.clone()));
        api.gates.borrow_mut().push_back(None);
        api.push_prices(Ok(series(&[0.1, 0.2])));
        api.push_prices(Ok(series(&[0.1, 0.2, 0.3])));

        let first = card.refresh();
        let second = async {
            let outcome = card.refresh().await;
            gate.notify_one();
            outcome
        };
        let (first, second) = tokio::join!(first, second);

        assert!(matches!(first, RefreshOutcome::Superseded));
        assert!(matches!(second, RefreshOutcome::Rendered { bars: 3 }));
        assert_eq!(charts.live.get(), 1);

        let view = card.view().unwrap();
        assert_eq!(view.chart.unwrap().bars.len(), 3);
        assert!(!view.loading);
    }
}
