use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use fanout::{init_logging, Broker, BrokerConfig, CancellationToken, LogFormat, LoggingConfig};
use tracing::info;

/// Демонстрация fan-out: N каналов, N подписчиков на растущие префиксы
/// каналов, по одной публикации в каждый канал.
#[derive(Debug, Parser)]
#[command(name = "fanout-demo", version, about)]
struct Args {
    /// Количество каналов и подписчиков.
    #[arg(short, long, default_value_t = 8)]
    channels: usize,

    /// Директива фильтра логов.
    #[arg(long, default_value = "info", env = "FANOUT_LOG_LEVEL")]
    log_level: String,

    /// Формат логов: pretty, compact или json.
    #[arg(long, default_value = "compact")]
    format: String,

    /// Сколько ждать каждое сообщение, мс.
    #[arg(long, default_value_t = 1000)]
    recv_timeout_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let format: LogFormat = args.format.parse()?;
    init_logging(LoggingConfig {
        level: args.log_level.clone(),
        format,
        ..Default::default()
    })?;

    let config = BrokerConfig::load().context("loading broker config")?;
    let token = CancellationToken::new();
    let broker: Broker<usize> = Broker::with_config(token.clone(), config)?;

    let names: Vec<String> = (0..args.channels).map(|i| format!("ch-{i}")).collect();
    let mut subs: Vec<_> = (1..=args.channels)
        .map(|n| broker.subscribe(&names[..n]))
        .collect();

    for (i, name) in names.iter().enumerate() {
        let report = broker.publish([name], i);
        info!(channel = %name, deliveries = report.deliveries, "published");
    }

    let timeout = Duration::from_millis(args.recv_timeout_ms);
    for sub in &mut subs {
        let expected = sub.channels().count();
        let mut received = 0;
        while received < expected {
            match sub.recv_timeout(timeout).await {
                Ok(_) => received += 1,
                Err(err) => {
                    info!(subscription_id = %sub.id(), %err, "stopped reading");
                    break;
                }
            }
        }
        println!("{}: {received}/{expected} messages", sub.id());
        sub.unsubscribe().await;
    }

    token.cancel();
    let stats = broker.stats();
    info!(?stats, "broker finished");
    Ok(())
}
