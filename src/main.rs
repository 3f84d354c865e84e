use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use riskon::api::{MarketData, YahooClient};
use riskon::synthetic::{MarketScenario, SyntheticMarket};
use riskon::{AppConfig, PriceTable, Recommendation, SignalEngine};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "riskon")]
#[command(about = "Risk-on momentum allocation: regime filter plus top-2 momentum ranking")]
struct Cli {
    /// Path to a TOML/JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print the recommendation as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch daily prices and compute today's allocation
    Signal,
    /// Compute an allocation on a seeded synthetic market (no network)
    Demo {
        /// RNG seed
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Number of sessions to generate
        #[arg(long, default_value_t = 504)]
        sessions: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cli = Cli::parse();
    let app = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let engine = SignalEngine::new(app.strategy.clone())?;

    let table = match cli.command {
        Commands::Signal => fetch_prices(&app).await?,
        Commands::Demo { seed, sessions } => synthetic_prices(&app, seed, sessions)?,
    };

    match engine.evaluate(&table) {
        Ok(recommendation) => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&recommendation)?);
            } else {
                print_recommendation(&engine, &recommendation);
            }
            Ok(())
        }
        Err(e) if e.is_data_error() => {
            if cli.json {
                println!("{}", serde_json::json!({ "allocation": null, "error": e.to_string() }));
            } else {
                println!("⚠️  INSUFFICIENT DATA - no allocation");
                println!("   {}", e);
            }
            std::process::exit(2);
        }
        Err(e) => Err(e.into()),
    }
}

fn setup_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("riskon=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn fetch_prices(app: &AppConfig) -> Result<PriceTable> {
    let client = YahooClient::new(&app.data)?;
    let market = MarketData::new(client, Duration::from_secs(app.data.cache_ttl_secs));

    market
        .price_table(&app.strategy.symbols(), &app.data.history_range)
        .await
}

fn synthetic_prices(app: &AppConfig, seed: u64, sessions: usize) -> Result<PriceTable> {
    tracing::info!("Generating {} synthetic sessions (seed {})", sessions, seed);

    let assets: Vec<(String, MarketScenario)> = app
        .strategy
        .symbols()
        .into_iter()
        .zip(MarketScenario::ALL.iter().cycle().copied())
        .collect();

    Ok(SyntheticMarket::new(seed).generate_table(&assets, sessions)?)
}

fn print_recommendation(engine: &SignalEngine, rec: &Recommendation) {
    let config = engine.config();

    println!("\n╔═══════════════════════════════════════════════════════╗");
    println!("║          RISK-ON MOMENTUM - TOP 2                     ║");
    println!("╚═══════════════════════════════════════════════════════╝");

    println!("\n🌍 Market regime ({} vs EMA{})", config.reference_asset, config.ema_len);
    println!(
        "   {} {}   price {:.2} / EMA {:.2}",
        rec.trend.regime,
        if rec.trend.regime.is_risk_on() { "✅" } else { "❌" },
        rec.trend.last_price,
        rec.trend.ema
    );

    println!(
        "\n📈 Momentum ({} sessions, skipping last {})",
        config.lookback, config.skip
    );
    println!("{:<12} {:<8} {:>10}", "Asset", "Symbol", "Return %");
    println!("{}", "─".repeat(32));
    for score in &rec.ranking {
        println!(
            "{:<12} {:<8} {:>10.2}",
            score.asset,
            score.symbol,
            score.score * 100.0
        );
    }

    println!("\n💼 Allocation");
    if rec.allocation.is_cash() {
        println!("   CASH - 100%");
    } else {
        for holding in rec.allocation.holdings() {
            println!("   {} - {:.0}%", holding.asset, holding.weight * 100.0);
        }
    }

    println!(
        "\nData as of {} | Generated {}",
        rec.as_of,
        Utc::now().format("%Y-%m-%d %H:%M UTC")
    );
    println!("═══════════════════════════════════════════════════════\n");
}
