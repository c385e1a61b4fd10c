// trustbroker/src/main.rs
//
// Demo CLI harness driving trustbroker::BrokerContext against a JSONL
// event log, in tail or replay mode — modeled on the teacher's
// tail/replay modes for feeding a pipeline from a captured log instead
// of a live feed.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

use trustbroker::config::BrokerOptions;
use trustbroker::context::BrokerContext;
use trustbroker::interceptor::MessageEvent;

#[derive(Parser, Debug)]
#[command(name = "trustbroker", about = "Trust-aware pub/sub interception layer demo harness")]
struct Cli {
    /// This broker's own identity (the "self" node in the network graph).
    #[arg(long, default_value = "B0")]
    broker_id: String,

    #[arg(long, default_value = "acl.txt")]
    acl_file: PathBuf,

    #[arg(long, default_value = "changeme")]
    hmac_key: String,

    #[arg(long, default_value = "network_map.txt")]
    network_map: PathBuf,

    /// `%s` is replaced with `broker_id`.
    #[arg(long, default_value = "trust_store_%s.txt")]
    trust_store_template: String,

    #[arg(long, default_value_t = 10)]
    tick_interval: u64,

    #[arg(long, value_enum, default_value_t = Mode::Tail)]
    mode: Mode,

    /// JSONL event log: one `{"topic": "...", "payload": "..."}` per line.
    #[arg(long)]
    path: PathBuf,

    /// Replay speed multiplier; ignored in `tail` mode.
    #[arg(long, default_value_t = 1.0)]
    speed: f64,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    /// Follow the log as new lines are appended.
    Tail,
    /// Replay the full log once, pacing between lines by `speed`.
    Replay,
}

#[derive(Deserialize)]
struct EventLine {
    topic: String,
    payload: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .compact()
        .init();

    let cli = Cli::parse();
    let options = BrokerOptions {
        broker_id: cli.broker_id.clone(),
        acl_file: cli.acl_file.clone(),
        hmac_key: cli.hmac_key.clone().into_bytes(),
        log_file: None,
        network_map_file: cli.network_map.clone(),
        trust_store_template: cli.trust_store_template.clone(),
    };

    info!(broker_id = %cli.broker_id, mode = ?cli.mode, "starting trustbroker");
    let ctx = Arc::new(Mutex::new(BrokerContext::init(options)));

    let tick_ctx = ctx.clone();
    let tick_interval = cli.tick_interval.max(1);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(tick_interval));
        loop {
            interval.tick().await;
            tick_ctx.lock().on_tick();
        }
    });

    match cli.mode {
        Mode::Tail => tail_jsonl(&ctx, &cli.path).await?,
        Mode::Replay => replay_jsonl(&ctx, &cli.path, cli.speed).await?,
    }

    ctx.lock().cleanup();
    Ok(())
}

async fn tail_jsonl(ctx: &Arc<Mutex<BrokerContext>>, path: &PathBuf) -> anyhow::Result<()> {
    let file = tokio::fs::File::open(path).await?;
    let mut lines = BufReader::new(file).lines();
    info!(path = %path.display(), "tailing event log");
    loop {
        match lines.next_line().await? {
            Some(line) => process_line(ctx, &line),
            None => tokio::time::sleep(Duration::from_millis(50)).await,
        }
    }
}

async fn replay_jsonl(ctx: &Arc<Mutex<BrokerContext>>, path: &PathBuf, speed: f64) -> anyhow::Result<()> {
    let content = tokio::fs::read_to_string(path).await?;
    let delay = Duration::from_millis((200.0 / speed.max(0.01)) as u64);
    for line in content.lines() {
        process_line(ctx, line);
        tokio::time::sleep(delay).await;
    }
    Ok(())
}

fn process_line(ctx: &Arc<Mutex<BrokerContext>>, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    let parsed: EventLine = match serde_json::from_str(line) {
        Ok(p) => p,
        Err(e) => {
            error!(error = %e, "skipping unparsable event line");
            return;
        }
    };
    let mut event = MessageEvent::new(parsed.topic, parsed.payload.into_bytes());
    let decision = ctx.lock().on_message(&mut event);
    info!(topic = %event.topic, decision = ?decision, "processed event");
}
