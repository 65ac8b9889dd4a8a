//! Chart Component
//!
//! Price bar chart drawn on an HTML5 Canvas inside the card's shadow root.

use async_trait::async_trait;
use energy_cards::error::{CardError, CardResult};
use energy_cards::price_card::{ChartHandle, ChartLibrary, ChartSpec};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, ShadowRoot};

/// Element id of the chart canvas in the card layout
pub const CANVAS_ID: &str = "price-chart";

// Margins
const MARGIN_LEFT: f64 = 60.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 40.0;

/// Chart library drawing onto the card's canvas
pub struct CanvasChart {
    root: ShadowRoot,
}

impl CanvasChart {
    pub fn new(root: ShadowRoot) -> Self {
        Self { root }
    }

    fn canvas(&self) -> CardResult<HtmlCanvasElement> {
        self.root
            .get_element_by_id(CANVAS_ID)
            .and_then(|el| el.dyn_into::<HtmlCanvasElement>().ok())
            .ok_or_else(|| CardError::ChartLibrary("chart canvas not found".to_string()))
    }
}

fn context(canvas: &HtmlCanvasElement) -> CardResult<CanvasRenderingContext2d> {
    canvas
        .get_context("2d")
        .ok()
        .flatten()
        .and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok())
        .ok_or_else(|| CardError::ChartLibrary("2d canvas context unavailable".to_string()))
}

#[async_trait(?Send)]
impl ChartLibrary for CanvasChart {
    async fn ensure_loaded(&self) -> CardResult<()> {
        let canvas = self.canvas()?;
        context(&canvas).map(|_| ())
    }

    fn render(&self, spec: &ChartSpec) -> CardResult<Box<dyn ChartHandle>> {
        let canvas = self.canvas()?;
        let ctx = context(&canvas)?;
        draw_chart(&canvas, &ctx, spec);

        let tooltips: Vec<String> = spec.bars.iter().map(|b| b.tooltip.clone()).collect();
        let target = canvas.clone();
        let listener = Closure::<dyn FnMut(MouseEvent)>::new(move |ev: MouseEvent| {
            let title = bar_at(&target, ev.offset_x() as f64, tooltips.len())
                .and_then(|idx| tooltips.get(idx))
                .map(String::as_str)
                .unwrap_or("");
            target.set_title(title);
        });
        canvas
            .add_event_listener_with_callback("mousemove", listener.as_ref().unchecked_ref())
            .map_err(|_| CardError::ChartLibrary("failed to attach chart listener".to_string()))?;

        Ok(Box::new(CanvasChartHandle {
            canvas,
            ctx,
            listener: Some(listener),
        }))
    }
}

/// A drawn chart and its hover listener
struct CanvasChartHandle {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    listener: Option<Closure<dyn FnMut(MouseEvent)>>,
}

impl ChartHandle for CanvasChartHandle {
    fn destroy(&mut self) {
        if let Some(listener) = self.listener.take() {
            let _ = self
                .canvas
                .remove_event_listener_with_callback("mousemove", listener.as_ref().unchecked_ref());
        }
        self.ctx.clear_rect(
            0.0,
            0.0,
            self.canvas.width() as f64,
            self.canvas.height() as f64,
        );
        self.canvas.set_title("");
    }
}

/// Bar index under a pointer offset given in CSS pixels
fn bar_at(canvas: &HtmlCanvasElement, offset_x: f64, count: usize) -> Option<usize> {
    if count == 0 || canvas.client_width() <= 0 {
        return None;
    }
    let scale = canvas.width() as f64 / canvas.client_width() as f64;
    let x = offset_x * scale - MARGIN_LEFT;
    let chart_width = canvas.width() as f64 - MARGIN_LEFT - MARGIN_RIGHT;
    if x < 0.0 || x >= chart_width {
        return None;
    }
    Some(((x / chart_width) * count as f64) as usize)
}

/// Draw the bars, axis and titles
fn draw_chart(canvas: &HtmlCanvasElement, ctx: &CanvasRenderingContext2d, spec: &ChartSpec) {
    let width = canvas.width() as f64;
    let height = canvas.height() as f64;
    let chart_width = width - MARGIN_LEFT - MARGIN_RIGHT;
    let chart_height = height - MARGIN_TOP - MARGIN_BOTTOM;

    ctx.clear_rect(0.0, 0.0, width, height);

    // Titles
    ctx.set_fill_style(&"#212121".into());
    ctx.set_font("bold 16px sans-serif");
    let _ = ctx.fill_text(&spec.title, MARGIN_LEFT, 20.0);
    ctx.set_fill_style(&"#757575".into());
    ctx.set_font("12px sans-serif");
    let _ = ctx.fill_text(&spec.subtitle, MARGIN_LEFT, 38.0);

    if spec.bars.is_empty() {
        ctx.set_font("16px sans-serif");
        let _ = ctx.fill_text("No prices for selected date", width / 2.0 - 90.0, height / 2.0);
        return;
    }

    // Y range always includes the zero baseline
    let mut y_min = spec.bars.iter().map(|b| b.value).fold(0.0, f64::min);
    let mut y_max = spec.bars.iter().map(|b| b.value).fold(0.0, f64::max);
    if y_min == y_max {
        y_max += 1.0;
    }
    let y_padding = (y_max - y_min) * 0.1;
    if y_min < 0.0 {
        y_min -= y_padding;
    }
    y_max += y_padding;

    let to_y = |value: f64| MARGIN_TOP + ((y_max - value) / (y_max - y_min)) * chart_height;

    // Horizontal grid lines (5 lines)
    ctx.set_stroke_style(&"#e0e0e0".into());
    ctx.set_line_width(1.0);
    for i in 0..=5 {
        let y = MARGIN_TOP + (i as f64 / 5.0) * chart_height;
        ctx.begin_path();
        ctx.move_to(MARGIN_LEFT, y);
        ctx.line_to(width - MARGIN_RIGHT, y);
        ctx.stroke();

        let value = y_max - (i as f64 / 5.0) * (y_max - y_min);
        ctx.set_fill_style(&"#757575".into());
        let _ = ctx.fill_text(&format!("{:.2}", value), 5.0, y + 4.0);
    }

    let slot = chart_width / spec.bars.len() as f64;
    let bar_width = slot * 0.8;
    let baseline = to_y(0.0);

    for (i, bar) in spec.bars.iter().enumerate() {
        let x = MARGIN_LEFT + i as f64 * slot + (slot - bar_width) / 2.0;
        let top = to_y(bar.value);
        ctx.set_fill_style(&bar.color.css().into());
        ctx.fill_rect(x, top.min(baseline), bar_width, (baseline - top).abs());
    }

    // Every label when they fit, otherwise every few
    ctx.set_fill_style(&"#757575".into());
    ctx.set_font("11px sans-serif");
    let step = ((spec.bars.len() as f64 * 40.0) / chart_width).ceil().max(1.0) as usize;
    for (i, bar) in spec.bars.iter().enumerate().step_by(step) {
        let x = MARGIN_LEFT + i as f64 * slot;
        let _ = ctx.fill_text(&bar.label, x, height - 10.0);
    }
}
