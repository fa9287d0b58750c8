//! The dashboard state owner and its single-consumer input loop.
//!
//! [`Dashboard`] holds the scan controller, the latency window and the
//! system info panel. All mutation goes through [`Dashboard::apply`], one
//! input at a time; [`run_controller`] drains an in-order channel of inputs
//! and publishes an immutable [`DashboardSnapshot`] after each one.

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::config::DashConfig;
use crate::events::{InboundEvent, OutboundEvent};
use crate::latency::{
    now_time_label, ChartData, LatencyReadout, LatencySeriesBuffer,
    LatencyThresholds,
};
use crate::scan::{ScanError, ScanLifecycleController, ScanState};
use crate::types::SystemInfo;

/// Everything that can change the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardInput {
    /// Pushed by the backend.
    Event(InboundEvent),
    /// The user pressed the start control.
    StartRequested,
    /// Result of the one-off `GET /system_info`.
    SystemInfo(SystemInfo),
    /// A latency probe with a known time label, e.g. from a recording.
    LatencyAt { time_label: String, latency: f64 },
}

/// Read-only view handed to renderers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub scan: ScanState,
    pub control_enabled: bool,
    pub latency: ChartData,
    pub readout: Option<LatencyReadout>,
    pub system_info: Option<SystemInfo>,
}

impl Default for DashboardSnapshot {
    fn default() -> Self {
        Dashboard::default().snapshot()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    scan: ScanLifecycleController,
    latency: LatencySeriesBuffer,
    thresholds: LatencyThresholds,
    readout: Option<LatencyReadout>,
    system_info: Option<SystemInfo>,
}

impl Dashboard {
    pub fn new(config: &DashConfig) -> Self {
        Self::with_window(config.window, config.thresholds)
    }

    pub fn with_window(window: usize, thresholds: LatencyThresholds) -> Self {
        Self {
            scan: ScanLifecycleController::new(),
            latency: LatencySeriesBuffer::new(window),
            thresholds,
            readout: None,
            system_info: None,
        }
    }

    pub fn scan(&self) -> &ScanLifecycleController {
        &self.scan
    }

    pub fn latency(&self) -> &LatencySeriesBuffer {
        &self.latency
    }

    pub fn readout(&self) -> Option<&LatencyReadout> {
        self.readout.as_ref()
    }

    /// Apply one input. Returns the event to send to the backend, if any.
    pub fn apply(&mut self, input: DashboardInput) -> Option<OutboundEvent> {
        match input {
            DashboardInput::Event(event) => {
                self.handle_event(event);
                None
            }
            DashboardInput::StartRequested => match self.start_scan() {
                Ok(out) => Some(out),
                Err(e) => {
                    tracing::warn!(error = %e, "Start request rejected");
                    None
                }
            },
            DashboardInput::SystemInfo(info) => {
                self.system_info = Some(info);
                None
            }
            DashboardInput::LatencyAt {
                time_label,
                latency,
            } => {
                self.record_latency(time_label, latency);
                None
            }
        }
    }

    pub fn start_scan(&mut self) -> Result<OutboundEvent, ScanError> {
        let out = self.scan.start()?;
        tracing::info!("Scan requested");
        Ok(out)
    }

    /// Dispatch a backend event. Returns whether it changed any state.
    pub fn handle_event(&mut self, event: InboundEvent) -> bool {
        let name = event.name();
        let applied = match event {
            InboundEvent::ScanStatus { status } => self.scan.on_status(status),
            InboundEvent::ScanResults(report) => {
                let hosts = report.hosts.len();
                let applied = self.scan.on_success(report);
                if applied {
                    tracing::info!(hosts, "Scan completed");
                }
                applied
            }
            InboundEvent::ScanError { error } => {
                let applied = self.scan.on_failure(error.clone());
                if applied {
                    tracing::warn!(error = %error, "Scan failed");
                }
                applied
            }
            InboundEvent::WanLatency { latency } => {
                self.record_latency(now_time_label(), latency);
                true
            }
        };
        if !applied {
            tracing::trace!(event = name, "Ignoring event while no scan is running");
        }
        applied
    }

    /// Push a raw probe value into the chart window and refresh the readout.
    pub fn record_latency(&mut self, time_label: impl Into<String>, raw: f64) {
        let value = self.latency.append_raw(time_label, raw);
        self.readout = Some(LatencyReadout::new(value, &self.thresholds));
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            scan: self.scan.state().clone(),
            control_enabled: self.scan.control_enabled(),
            latency: self.latency.chart_data(),
            readout: self.readout.clone(),
            system_info: self.system_info.clone(),
        }
    }
}

/// Cloneable handle for producers of inputs and readers of snapshots.
#[derive(Debug, Clone)]
pub struct DashboardHandle {
    inputs: mpsc::UnboundedSender<DashboardInput>,
    snapshots: watch::Receiver<DashboardSnapshot>,
}

impl DashboardHandle {
    /// Queue an input. Returns `false` once the controller has stopped.
    pub fn send(&self, input: DashboardInput) -> bool {
        self.inputs.send(input).is_ok()
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardSnapshot> {
        self.snapshots.clone()
    }
}

/// Spawn the controller task. Outbound events go to `outbound`.
pub fn spawn_controller(
    dashboard: Dashboard,
    outbound: mpsc::UnboundedSender<OutboundEvent>,
    cancel: CancellationToken,
) -> (DashboardHandle, tokio::task::JoinHandle<Dashboard>) {
    let (input_tx, input_rx) = mpsc::unbounded_channel();
    let (snapshot_tx, snapshot_rx) = watch::channel(dashboard.snapshot());
    let task = tokio::spawn(run_controller(
        dashboard,
        input_rx,
        outbound,
        snapshot_tx,
        cancel,
    ));
    let handle = DashboardHandle {
        inputs: input_tx,
        snapshots: snapshot_rx,
    };
    (handle, task)
}

/// Drain inputs in arrival order until the channel closes or `cancel` fires.
///
/// Returns the dashboard so callers can inspect the final state.
pub async fn run_controller(
    mut dashboard: Dashboard,
    mut inputs: mpsc::UnboundedReceiver<DashboardInput>,
    outbound: mpsc::UnboundedSender<OutboundEvent>,
    snapshots: watch::Sender<DashboardSnapshot>,
    cancel: CancellationToken,
) -> Dashboard {
    loop {
        let input = tokio::select! {
            _ = cancel.cancelled() => break,
            input = inputs.recv() => match input {
                Some(input) => input,
                None => break,
            },
        };
        if let Some(event) = dashboard.apply(input) {
            if outbound.send(event).is_err() {
                tracing::warn!(event = event.name(), "Transport closed, outbound event dropped");
            }
        }
        snapshots.send_replace(dashboard.snapshot());
    }
    tracing::debug!("Dashboard controller stopped");
    dashboard
}
