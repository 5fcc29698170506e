use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;

use polywatch::api::router::create_router;
use polywatch::config::AppConfig;
use polywatch::db;
use polywatch::errors::ScanError;
use polywatch::ingestion::{ScanSettings, Scanner};
use polywatch::intelligence::{AccountProfiler, ActivitySource, DisplayNameSource, MarketClassifier};
use polywatch::polymarket::{DataClient, GammaClient};
use polywatch::services::{
    AlertDispatcher, AlertStore, JsonlAlertLog, Notifier, SheetWebhook,
};
use polywatch::AppState;

#[derive(Parser)]
#[command(name = "polywatch", version, about = "Polymarket fresh-wallet large-trade monitor")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a single scan cycle and exit
    Scan,
    /// Scan every SCAN_INTERVAL_SECS until interrupted
    Run,
    /// Scan all large trades of the last N hours and exit
    Backfill {
        #[arg(long, default_value_t = 24)]
        hours: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    let metrics_handle = polywatch::metrics::init_metrics()?;
    let scanner = build_scanner(&config).await?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Scan => {
            let report = scanner.run_cycle().await?;
            tracing::info!(alerted = report.alerted, "Single scan finished");
        }
        Command::Backfill { hours } => {
            tracing::info!(hours = hours, "Starting backfill");
            let report = scanner.backfill(hours).await?;
            tracing::info!(
                fetched = report.fetched,
                alerted = report.alerted,
                "Backfill finished"
            );
        }
        Command::Run => {
            let state = AppState {
                config: config.clone(),
                metrics_handle,
                last_cycle: Arc::new(RwLock::new(None)),
            };
            run_loop(scanner, state).await?;
        }
    }

    Ok(())
}

async fn build_scanner(config: &AppConfig) -> anyhow::Result<Scanner> {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()?;

    let data_client = Arc::new(
        DataClient::new(http.clone())
            .with_base_url(config.data_api_url.clone())
            .with_page_limit(config.feed_page_limit),
    );
    let gamma: Arc<dyn DisplayNameSource> =
        Arc::new(GammaClient::new(http.clone()).with_base_url(config.gamma_api_url.clone()));
    let activity: Arc<dyn ActivitySource> = data_client.clone();

    let profiler = AccountProfiler::new(
        activity,
        Some(gamma),
        config.profiler_page_size,
        config.profiler_max_pages,
    );

    let classifier = match &config.category_keywords_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading category keywords");
            MarketClassifier::from_toml_file(path)?
        }
        None => MarketClassifier::default(),
    };

    let store: Arc<dyn AlertStore> = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let pool = db::init_pool(url).await?;
            tracing::info!("Database connected");
            Arc::new(db::PgAlertStore::new(pool))
        }
        None => {
            tracing::info!(path = %config.alert_log_path.display(), "No DATABASE_URL, logging alerts to JSONL");
            Arc::new(JsonlAlertLog::new(config.alert_log_path.clone()))
        }
    };

    let mut dispatcher = AlertDispatcher::new(config.notify_categories.clone())
        .with_store(store)
        .with_report_threshold(config.min_bet_usd);

    if config.has_telegram() {
        if let (Some(token), Some(chat_id)) = (&config.telegram_bot_token, &config.telegram_chat_id) {
            dispatcher = dispatcher.with_notifier(Arc::new(Notifier::new(
                http.clone(),
                token.clone(),
                chat_id.clone(),
            )));
            tracing::info!("Telegram notifier enabled");
        }
    } else {
        tracing::warn!("Telegram not configured, alerts go to durable sinks only");
    }

    if let Some(url) = &config.sheet_webhook_url {
        dispatcher = dispatcher.with_sheet(Arc::new(SheetWebhook::new(http.clone(), url.clone())));
        tracing::info!("Sheet webhook enabled");
    }

    Ok(Scanner::new(
        data_client,
        profiler,
        classifier,
        Arc::new(dispatcher),
        ScanSettings::from_config(config),
    ))
}

async fn run_loop(scanner: Scanner, state: AppState) -> anyhow::Result<()> {
    let config = state.config.clone();

    if let Some(port) = config.http_port {
        let addr = format!("{}:{}", config.host, port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        let router = create_router(state.clone());
        tracing::info!("Health server listening on {addr}");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!(error = %e, "Health server stopped");
            }
        });
    }

    tracing::info!(
        interval_secs = config.scan_interval_secs,
        min_bet_usd = %config.min_bet_usd,
        "Scanner started"
    );

    let mut scan_tick = tokio::time::interval(Duration::from_secs(config.scan_interval_secs.max(1)));
    scan_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let rollup_period = Duration::from_secs(config.rollup_interval_secs.max(60));
    let mut rollup_tick = tokio::time::interval_at(tokio::time::Instant::now() + rollup_period, rollup_period);
    rollup_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = scan_tick.tick() => {
                match scanner.run_cycle().await {
                    Ok(report) => *state.last_cycle.write().await = Some(report),
                    Err(ScanError::Locked(path)) => {
                        tracing::warn!(path = %path, "Previous cycle still running, skipping");
                    }
                    Err(e) => tracing::error!(error = %e, "Scan cycle failed"),
                }
            }
            _ = rollup_tick.tick() => {
                let outcome = scanner.dispatcher().send_rollup().await;
                tracing::info!(outcome = %outcome, "Roll-up processed");
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received");
                break;
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
