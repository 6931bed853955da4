use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tilt_gesture::replay::Replay;
use tilt_gesture::trace::{Trace, TraceSource};
use tilt_gesture::{GameSession, SessionState, TiltConfig};

#[derive(Parser, Debug)]
#[command(name = "tilt_replay")]
#[command(about = "Replay a recorded orientation trace through the tilt gesture engine", long_about = None)]
struct Args {
    /// Path to a trace (.json or .json.gz)
    #[arg(value_name = "TRACE")]
    trace: PathBuf,

    /// JSON config file (camelCase keys; missing keys use defaults)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override tiltThreshold (degrees)
    #[arg(long)]
    tilt_threshold: Option<f64>,

    /// Override returnThreshold (degrees)
    #[arg(long)]
    return_threshold: Option<f64>,

    /// Override calibrationCooldownMs
    #[arg(long)]
    cooldown_ms: Option<u64>,

    /// Start in the waiting-for-ready phase
    #[arg(long, default_value_t = false)]
    ready: bool,

    /// Pace delivery by the recorded timestamps
    #[arg(long, default_value_t = false)]
    realtime: bool,

    /// Frame interval for firing timers between samples (0 = only on samples)
    #[arg(long, default_value = "16")]
    tick_ms: u64,

    /// Extra time to run after the last recorded entry
    #[arg(long, default_value = "1000")]
    tail_ms: u64,
}

fn load_config(args: &Args) -> Result<TiltConfig> {
    let mut config = match &args.config {
        Some(path) => TiltConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => TiltConfig::default(),
    };
    if let Some(v) = args.tilt_threshold {
        config.tilt_threshold = v;
    }
    if let Some(v) = args.return_threshold {
        config.return_threshold = v;
    }
    if let Some(v) = args.cooldown_ms {
        config.calibration_cooldown_ms = v;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = load_config(&args)?;
    let trace = Trace::load(&args.trace)
        .with_context(|| format!("loading trace {}", args.trace.display()))?;
    log::info!(
        "Loaded {} readings, {} commands ({} ms)",
        trace.readings.len(),
        trace.commands.len(),
        trace.duration_ms()
    );

    let mut source = TraceSource::new(&trace, args.realtime);
    let mut session = GameSession::new();

    if session.negotiate_permission(&mut source).await? == SessionState::ManualFallback {
        log::warn!("Tilt unavailable; nothing to replay");
        println!("{}", serde_json::to_string(&session.end()?)?);
        return Ok(());
    }

    let mut replay = Replay::new(config, trace.commands.clone())?.with_tick_ms(args.tick_ms);
    if args.ready {
        replay.tracker_mut().begin_ready_phase();
    }

    let mut subscription = session.subscribe(&mut source)?;
    while let Some(reading) = subscription.next().await {
        for event in replay.push(reading) {
            println!("{}", serde_json::to_string(&event)?);
        }
    }
    drop(subscription);

    let (tail, summary) = replay.finish(trace.duration_ms() + args.tail_ms);
    for event in tail {
        println!("{}", serde_json::to_string(&event)?);
    }

    let metadata = session.end()?;
    log::info!(
        "{}: {} correct, {} passed, {} returns, {} ready",
        metadata.session_id,
        summary.correct,
        summary.passed,
        summary.returns,
        summary.ready
    );
    println!("{}", serde_json::to_string(&summary)?);

    Ok(())
}
