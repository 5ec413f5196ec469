//! bfxgram - Bitfinex account feed relayed to Telegram.
//!
//! Keeps an authenticated feed session alive and forwards account events
//! to every authenticated chat.

mod config;

use bfxgram_alerts::{CommandHandler, Database, Delivery, Notifier, TelegramBot};
use bfxgram_feeds::{
    run_bitfinex, Deliver, Dispatcher, FeedConnection, FeedHandle, WsMessage, WsTransport,
};
use clap::Parser;
use config::{AppConfig, Secrets};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// bfxgram CLI
#[derive(Parser, Debug)]
#[command(name = "bfxgram")]
#[command(about = "Bitfinex account feed relayed to Telegram", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.json")]
    config: String,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// SQLite database URL (overrides the config file)
    #[arg(short, long)]
    database: Option<String>,

    /// Heartbeat timeout in seconds (overrides the config file)
    #[arg(short, long)]
    timeout_secs: Option<u64>,
}

fn init_logging(level: &str) {
    let level = match level {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

fn apply_overrides(config: &mut AppConfig, args: &Args) {
    if let Some(database) = &args.database {
        config.database_url = database.clone();
    }
    if let Some(secs) = args.timeout_secs {
        config.feed.heartbeat_timeout_ms = secs.saturating_mul(1000);
    }
}

/// Delivery callback for the dispatcher: hands messages to the notifier task.
fn delivery_sender(tx: mpsc::Sender<Delivery>) -> Deliver {
    Arc::new(move |tag: &str, text: &str| {
        if let Err(e) = tx.try_send((tag.to_string(), text.to_string())) {
            warn!(tag, error = %e, "Dropping message");
        }
    })
}

#[tokio::main]
async fn main() {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    init_logging(&args.log_level);

    let mut config = match AppConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load config: {}", e);
            return;
        }
    };
    apply_overrides(&mut config, &args);
    if let Err(e) = config.validate() {
        error!("{}", e);
        return;
    }

    let secrets = match Secrets::from_env() {
        Ok(secrets) => secrets,
        Err(e) => {
            error!("{}", e);
            return;
        }
    };

    info!("bfxgram starting...");
    info!("  Feed: {}", config.feed.ws_url);
    info!("  Heartbeat timeout: {:?}", config.feed.heartbeat_timeout());
    info!("  Database: {}", config.database_url);

    let db = match Database::connect(&config.database_url).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open database: {}", e);
            return;
        }
    };

    // Dispatcher -> notifier
    let (delivery_tx, delivery_rx) = mpsc::channel::<Delivery>(config.delivery_capacity);

    // The handle exists before the connection so the dispatcher can steer it.
    let (handle, commands) = FeedHandle::channel();
    let dispatcher = Dispatcher::new(handle.clone(), delivery_sender(delivery_tx));

    // Transport -> runner
    let (ws_tx, ws_rx) = mpsc::channel::<WsMessage>(config.feed.channel_capacity);
    let timeout = config.feed.heartbeat_timeout();
    let transport = WsTransport::new(config.feed.clone(), secrets.credentials, ws_tx);

    let connection = FeedConnection::spawn(transport, timeout, commands);
    let runner = tokio::spawn(run_bitfinex(ws_rx, dispatcher));

    let calc_handle = handle.clone();
    let handler = CommandHandler::new(
        db.clone(),
        secrets.auth_pass,
        Box::new(move |requests| calc_handle.calc(requests)),
    );
    let bot = Arc::new(TelegramBot::new(&secrets.telegram_token, handler));
    let notifier = tokio::spawn(Notifier::new(db, Arc::clone(&bot)).run(delivery_rx));

    info!("Bot running, press Ctrl-C to stop");
    bot.run().await;

    info!("Shutting down...");
    handle.close();
    if let Err(e) = connection.await {
        error!("Feed connection task failed: {}", e);
    }
    // Closing the connection drops the transport, which ends the runner
    // and with it the last delivery sender.
    let _ = runner.await;
    let _ = notifier.await;

    info!("Goodbye!");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cli_overrides() {
        let args = Args::parse_from(["bfxgram", "--database", "sqlite::memory:", "--timeout-secs", "30"]);
        let mut config = AppConfig::default();
        apply_overrides(&mut config, &args);
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.feed.heartbeat_timeout_ms, 30_000);
    }

    #[test]
    fn test_cli_defaults_keep_config() {
        let args = Args::parse_from(["bfxgram"]);
        let mut config = AppConfig::default();
        apply_overrides(&mut config, &args);
        assert_eq!(config.database_url, AppConfig::default().database_url);
        assert_eq!(args.config, "config.json");
        assert_eq!(args.log_level, "info");
    }

    #[tokio::test]
    async fn test_delivery_sender_forwards_pairs() {
        let (tx, mut rx) = mpsc::channel(1);
        let deliver = delivery_sender(tx);
        deliver("on", "<pre>x</pre>");
        // Full channel: dropped, not blocked.
        deliver("oc", "<pre>y</pre>");

        assert_eq!(rx.recv().await, Some(("on".to_string(), "<pre>x</pre>".to_string())));
        assert!(rx.try_recv().is_err());
    }
}
