use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tokio::net::TcpStream;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sensorwatch::{parse_duration, App, DataSource, FileSource, Settings, StreamSource};
use sensorwatch_engine::{JsonLinesNotifier, Runner};

#[derive(Parser, Debug)]
#[command(name = "sensorwatch")]
#[command(about = "Alert on stalled sensor series and zero readings")]
struct Args {
    /// Path to a snapshot JSON file
    #[arg(short, long, default_value = "snapshot.json", conflicts_with = "connect")]
    file: PathBuf,

    /// Connect to a TCP endpoint streaming newline-delimited snapshots (host:port)
    #[arg(short, long)]
    connect: Option<String>,

    /// TOML settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stall re-evaluation period (e.g. "60s")
    #[arg(long, value_parser = parse_duration)]
    tick: Option<Duration>,

    /// Source poll period (e.g. "1s")
    #[arg(long, value_parser = parse_duration)]
    poll: Option<Duration>,

    /// Half-width of the band around zero that counts as a zero reading
    #[arg(long)]
    epsilon: Option<f64>,

    /// Minimum spacing between stall reminders (e.g. "30m")
    #[arg(long, value_parser = parse_duration)]
    cooldown: Option<Duration>,

    /// Evaluate the file once, print events as JSON lines and exit
    #[arg(long, conflicts_with = "connect")]
    once: bool,
}

impl Args {
    fn apply(&self, settings: &mut Settings) {
        if let Some(tick) = self.tick {
            settings.tick_interval = tick;
        }
        if let Some(poll) = self.poll {
            settings.poll_interval = poll;
        }
        if let Some(epsilon) = self.epsilon {
            settings.zero.epsilon = epsilon;
        }
        if let Some(cooldown) = self.cooldown {
            settings.stall.cooldown = cooldown;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref())?;
    args.apply(&mut settings);
    settings.validate()?;

    if args.once {
        return run_once(&args.file, &settings);
    }

    let source: Box<dyn DataSource> = match args.connect {
        Some(ref addr) => connect(addr).await?,
        None => Box::new(FileSource::new(&args.file)),
    };

    run(source, &settings).await
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

/// Evaluate a single snapshot file and print the resulting events
fn run_once(path: &Path, settings: &Settings) -> Result<()> {
    let mut source = FileSource::new(path);
    let snapshot = source
        .read()
        .ok_or_else(|| anyhow!("{}", source.error().unwrap_or("No snapshot available")))?;

    let runner = Runner::builder()
        .check(settings.stall_check())
        .check(settings.zero_check())
        .notifier(JsonLinesNotifier::new(io::stdout()))
        .build();
    runner.push_snapshot(&snapshot);

    let stats = runner.stats();
    tracing::info!(
        events = stats.events_emitted,
        faults = stats.check_faults + stats.notifier_faults,
        "evaluation complete"
    );
    Ok(())
}

/// Open a TCP stream source
async fn connect(addr: &str) -> Result<Box<dyn DataSource>> {
    tracing::info!(addr, "connecting");
    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("Failed to connect to {}", addr))?;
    tracing::info!(addr, "connected");
    Ok(Box::new(StreamSource::spawn(stream, addr)))
}

/// Poll the source and tick the checks until shutdown
async fn run(source: Box<dyn DataSource>, settings: &Settings) -> Result<()> {
    let mut app = App::from_settings(source, settings)?;
    tracing::info!(source = app.source_description(), "watching");

    app.runner().start_tick(settings.tick_interval)?;

    let mut poll = tokio::time::interval(settings.poll_interval);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    while app.running {
        tokio::select! {
            () = &mut shutdown => app.quit(),
            _ = poll.tick() => {
                app.poll();
            }
        }
    }

    app.runner().stop_tick();
    let stats = app.runner().stats();
    tracing::info!(
        snapshots = stats.snapshots,
        ticks = stats.ticks,
        events = stats.events_emitted,
        "stopped"
    );
    Ok(())
}

/// Resolve on Ctrl-C, or SIGTERM on Unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl-C, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
