use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scan_dash_rs::config::DashConfig;
use scan_dash_rs::dashboard::{spawn_controller, Dashboard, DashboardInput, DashboardSnapshot};
use scan_dash_rs::{render, replay, server, sysinfo, transport};

/// scan-dash-rs: real-time LAN scan and WAN latency dashboard client.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "scan-dash-rs",
    version,
    about = "Real-time LAN scan and WAN latency dashboard client with a tiny embedded web UI.",
    long_about = None
)]
struct Cli {
    /// JSON config file. Flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Backend base URL (e.g., http://192.168.1.10:5000).
    #[arg(long)]
    backend: Option<String>,

    /// Number of latency samples kept for the chart.
    #[arg(long)]
    window: Option<usize>,

    /// Latencies below this many ms are shown as good.
    #[arg(long = "good-below-ms")]
    good_below_ms: Option<u64>,

    /// Latencies below this many ms (and not good) are shown as degraded.
    #[arg(long = "degraded-below-ms")]
    degraded_below_ms: Option<u64>,

    /// Start the embedded HTTP UI server.
    #[arg(long = "serve-ui", default_value_t = false)]
    serve_ui: bool,

    /// Request a scan as soon as the client starts.
    #[arg(long, default_value_t = false)]
    start: bool,

    /// Address for the embedded HTTP UI.
    #[arg(long)]
    bind: Option<String>,

    /// Replay newline-delimited JSON events from a file instead of connecting.
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Write the final replay snapshot as pretty JSON to this path (optional).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long = "log-level", default_value = "scan_dash_rs=info")]
    log_level: String,
}

impl Cli {
    fn load_config(&self) -> Result<DashConfig> {
        let mut cfg = match &self.config {
            Some(path) => DashConfig::from_path(path)?,
            None => DashConfig::default(),
        };
        if let Some(b) = &self.backend {
            cfg.backend_url = b.clone();
        }
        if let Some(w) = self.window {
            cfg.window = w;
        }
        if let Some(g) = self.good_below_ms {
            cfg.thresholds.good_below_ms = g;
        }
        if let Some(d) = self.degraded_below_ms {
            cfg.thresholds.degraded_below_ms = d;
        }
        if let Some(b) = &self.bind {
            cfg.bind = b.clone();
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = cli.load_config()?;

    println!("scan-dash-rs configuration:");
    println!("  backend      : {}", cfg.backend_url);
    println!("  window       : {}", cfg.window);
    println!(
        "  thresholds   : good < {} ms, degraded < {} ms",
        cfg.thresholds.good_below_ms, cfg.thresholds.degraded_below_ms
    );
    println!("  serve_ui     : {} ({})", cli.serve_ui, cfg.bind);
    println!(
        "  replay       : {}",
        cli.replay
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<none>".to_string())
    );

    if let Some(path) = cli.replay.as_deref() {
        return run_replay(&cfg, path, cli.output.as_deref());
    }

    run_live(&cfg, cli.serve_ui, cli.start).await
}

fn run_replay(cfg: &DashConfig, path: &Path, output: Option<&Path>) -> Result<()> {
    let inputs = replay::load_replay_from_path(path)?;
    let mut dashboard = Dashboard::new(cfg);
    let emitted = replay::replay(&mut dashboard, inputs);
    let snapshot = dashboard.snapshot();

    println!("\nReplayed {} (start_scan emitted {emitted} time(s))", path.display());
    print!("{}", render::render_text(&snapshot));

    if let Some(path) = output {
        write_snapshot_json(path, &snapshot)
            .with_context(|| format!("failed to write JSON to {}", path.display()))?;
        println!("Wrote JSON snapshot to {}", path.display());
    }
    Ok(())
}

async fn run_live(cfg: &DashConfig, serve_ui: bool, start: bool) -> Result<()> {
    let cancel = CancellationToken::new();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let (handle, controller) =
        spawn_controller(Dashboard::new(cfg), outbound_tx, cancel.clone());

    // One-off system info fetch; failure leaves the panel empty.
    let info_handle = handle.clone();
    let info_url = cfg.system_info_url();
    tokio::spawn(async move {
        let client = reqwest::Client::new();
        if let Some(info) = sysinfo::load_system_info(&client, &info_url).await {
            info_handle.send(DashboardInput::SystemInfo(info));
        }
    });

    let transport_task = tokio::spawn(transport::run(
        cfg.socket_url(),
        handle.clone(),
        outbound_rx,
        cfg.reconnect_delay(),
        cancel.clone(),
    ));

    if serve_ui {
        let state = server::AppState::new(handle.clone(), cfg.refresh_secs);
        let bind = cfg.bind.clone();
        let server_cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = server::spawn_server(&bind, state, server_cancel).await {
                tracing::error!(error = %e, "HTTP UI server error");
            }
        });
        println!("UI server starting at http://{} (Ctrl+C to stop)", cfg.bind);
    } else {
        // Without the web UI, print the text view whenever the scan state changes.
        let mut updates = handle.subscribe();
        let print_cancel = cancel.clone();
        tokio::spawn(async move {
            let mut last_scan = updates.borrow().scan.clone();
            loop {
                tokio::select! {
                    _ = print_cancel.cancelled() => break,
                    changed = updates.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let snapshot = updates.borrow_and_update().clone();
                        if snapshot.scan != last_scan {
                            print!("{}", render::render_text(&snapshot));
                            last_scan = snapshot.scan;
                        }
                    }
                }
            }
        });
    }

    if start {
        handle.send(DashboardInput::StartRequested);
    }

    println!("Press Ctrl+C to stop...");
    let _ = tokio::signal::ctrl_c().await;
    cancel.cancel();

    let _ = transport_task.await;
    let _ = controller.await;
    Ok(())
}

fn write_snapshot_json(path: &Path, snapshot: &DashboardSnapshot) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, snapshot)?;
    Ok(())
}
