//! Energy Cards preview
//!
//! Runs the cards outside the dashboard against live services:
//! - `panel`: sensor panel over Home Assistant's REST API
//! - `prices`: price card over the energy API, charted in the terminal
//! - `config`: print the default configuration file
//!
//! Run with: cargo run --bin energy-cards-preview -- prices --energy gas

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use energy_cards::config::{generate_default_config, EnergyType, LoggingConfig, PreviewConfig};
use energy_cards::error::CardResult;
use energy_cards::host::HomeAssistantClient;
use energy_cards::price_card::api::HttpPriceApi;
use energy_cards::price_card::{ChartHandle, ChartLibrary, ChartSpec, PriceCard, RefreshOutcome};
use energy_cards::sensor_panel::SensorPanel;
use std::path::PathBuf;
use std::rc::Rc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "energy-cards-preview")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Preview the energy dashboard cards from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: search standard locations)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the sensor panel from Home Assistant state
    Panel {
        /// Pick this date before rendering
        #[arg(short, long)]
        date: Option<String>,
        /// Print the shadow root markup instead of a summary
        #[arg(long)]
        html: bool,
    },

    /// Chart a day of prices from the energy API
    Prices {
        /// Energy type (power, gas)
        #[arg(short, long)]
        energy: Option<EnergyType>,
        /// Date (YYYY-MM-DD, one of the last seven days)
        #[arg(short, long)]
        date: Option<String>,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => PreviewConfig::load_with_env(path)?,
        None => PreviewConfig::load_default(),
    };
    init_logging(&config.logging);

    match cli.command {
        Commands::Panel { date, html } => preview_panel(&config, date, html).await,
        Commands::Prices { energy, date } => preview_prices(&config, energy, date).await,
        Commands::Config { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, content)
                        .with_context(|| format!("writing {:?}", path))?;
                    println!("Config written to {:?}", path);
                }
                None => print!("{}", content),
            }
            Ok(())
        }
    }
}

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("energy_cards={}", logging.level)));
    let registry = tracing_subscriber::registry().with(filter);

    if logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn preview_panel(config: &PreviewConfig, date: Option<String>, html: bool) -> anyhow::Result<()> {
    let raw = config
        .sensor_panel
        .as_ref()
        .ok_or_else(|| anyhow!("no [sensor_panel] section in config"))?;

    let client = Rc::new(HomeAssistantClient::from_config(&config.home_assistant)?);
    let panel = SensorPanel::new(client.clone());
    panel.set_config(raw)?;

    let panel_config = panel.config().ok_or_else(|| anyhow!("panel not configured"))?;
    let entities = [
        panel_config.power_entity.as_str(),
        panel_config.gas_entity.as_str(),
        panel_config.dates_entity.as_str(),
    ];
    client.refresh_states(&entities).await?;

    if let Some(date) = date {
        panel.select_date(&date).await?;
        client.refresh_states(&entities).await?;
    }

    let view = panel.update()?;
    if html {
        println!("{}", view.to_html());
        return Ok(());
    }

    println!("{}", view.title);
    if view.dates.is_empty() {
        println!("  {}", energy_cards::sensor_panel::NO_DATES_MESSAGE);
    }
    for date in &view.dates {
        let marker = if view.selected_date.as_ref() == Some(date) { '*' } else { ' ' };
        println!(" {} {}", marker, date);
    }
    println!("  Power data available: {}", yes_no(view.power_available));
    println!("  Gas data available: {}", yes_no(view.gas_available));

    for diagnostic in panel.diagnostics().records() {
        eprintln!("warning: {} sensor {}: {}", diagnostic.source, diagnostic.subject, diagnostic.message);
    }
    Ok(())
}

async fn preview_prices(
    config: &PreviewConfig,
    energy: Option<EnergyType>,
    date: Option<String>,
) -> anyhow::Result<()> {
    let raw = config
        .price_card
        .as_ref()
        .ok_or_else(|| anyhow!("no [price_card] section in config (or set ENERGY_CARDS_API_URL)"))?;

    let card = {
        let card_config = energy_cards::PriceCardConfig::from_value(raw)?;
        let api = Rc::new(HttpPriceApi::new(card_config.api_url)?);
        PriceCard::new(api, Some(Rc::new(TerminalChart)))
    };
    card.set_config(raw)?;
    card.on_host_update().await?;

    if energy.is_some() || date.is_some() {
        if let Some(energy) = energy {
            card.select_type(energy)?;
        }
        if let Some(date) = &date {
            card.select_date(date)?;
        }
        if let RefreshOutcome::Failed(e) = card.refresh().await {
            tracing::debug!(error = %e, "Refresh failed");
        }
    }

    if let Some(view) = card.view() {
        if let Some(summary) = &view.summary {
            println!("{}", summary);
        }
        if let Some(error) = &view.error {
            eprintln!("error: {}", error);
        }
    }
    Ok(())
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

/// Draws bar charts with ANSI colors on stdout
struct TerminalChart;

struct TerminalChartHandle;

impl ChartHandle for TerminalChartHandle {
    fn destroy(&mut self) {
        tracing::debug!("Terminal chart released");
    }
}

const BAR_WIDTH: f64 = 40.0;

#[async_trait(?Send)]
impl ChartLibrary for TerminalChart {
    async fn ensure_loaded(&self) -> CardResult<()> {
        Ok(())
    }

    fn render(&self, spec: &ChartSpec) -> CardResult<Box<dyn ChartHandle>> {
        println!("{}", spec.title);
        println!("{}", spec.subtitle);

        let scale = spec
            .bars
            .iter()
            .map(|b| b.value.abs())
            .fold(0.0_f64, f64::max);

        for bar in &spec.bars {
            let length = if scale > 0.0 {
                (bar.value.abs() / scale * BAR_WIDTH).round() as usize
            } else {
                0
            };
            let energy_cards::price_card::Rgb(r, g, b) = bar.color;
            println!(
                "{:>5} \x1b[38;2;{};{};{}m{}\x1b[0m {}",
                bar.label,
                r,
                g,
                b,
                "█".repeat(length),
                bar.tooltip
            );
        }

        Ok(Box::new(TerminalChartHandle))
    }
}
