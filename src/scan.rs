//! Scan lifecycle state machine.
//!
//! Tracks the single in-flight scan. Only `start` leaves a settled state;
//! `on_status`, `on_success` and `on_failure` act only while a scan is
//! running and are silently dropped otherwise, which shields the view from
//! duplicate or late deliveries.

use serde::Serialize;

use crate::events::OutboundEvent;
use crate::types::{HostResult, ScanReport};

/// Coarse phase of the lifecycle, convenient for matching and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanPhase {
    Idle,
    Running,
    Succeeded,
    Failed,
}

/// Full lifecycle state, including what each phase carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ScanState {
    Idle,
    Running {
        /// Last progress text pushed by the backend, if any.
        progress: Option<String>,
    },
    Succeeded(ScanReport),
    Failed {
        message: String,
    },
}

impl ScanState {
    pub fn phase(&self) -> ScanPhase {
        match self {
            ScanState::Idle => ScanPhase::Idle,
            ScanState::Running { .. } => ScanPhase::Running,
            ScanState::Succeeded(_) => ScanPhase::Succeeded,
            ScanState::Failed { .. } => ScanPhase::Failed,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, ScanState::Running { .. })
    }

    pub fn hosts(&self) -> Option<&[HostResult]> {
        match self {
            ScanState::Succeeded(report) => Some(&report.hosts),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ScanState::Failed { message } => Some(message),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    #[error("a scan is already running")]
    AlreadyRunning,
}

/// Owner of the scan lifecycle.
#[derive(Debug, Clone)]
pub struct ScanLifecycleController {
    state: ScanState,
}

impl Default for ScanLifecycleController {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanLifecycleController {
    pub fn new() -> Self {
        Self {
            state: ScanState::Idle,
        }
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    /// Whether the "start scan" control may be offered to the user.
    pub fn control_enabled(&self) -> bool {
        !self.state.is_running()
    }

    /// Begin a new scan, discarding any previous outcome.
    ///
    /// Returns the event to hand to the transport. While a scan is running
    /// the request is rejected and nothing is emitted.
    pub fn start(&mut self) -> Result<OutboundEvent, ScanError> {
        if self.state.is_running() {
            return Err(ScanError::AlreadyRunning);
        }
        self.state = ScanState::Running { progress: None };
        Ok(OutboundEvent::StartScan)
    }

    /// Record a progress message. Returns whether it was applied.
    pub fn on_status(&mut self, text: impl Into<String>) -> bool {
        match &mut self.state {
            ScanState::Running { progress } => {
                *progress = Some(text.into());
                true
            }
            _ => false,
        }
    }

    /// Settle the running scan with its results. Returns whether it was applied.
    pub fn on_success(&mut self, report: ScanReport) -> bool {
        if !self.state.is_running() {
            return false;
        }
        self.state = ScanState::Succeeded(report);
        true
    }

    /// Settle the running scan with an error. Returns whether it was applied.
    pub fn on_failure(&mut self, message: impl Into<String>) -> bool {
        if !self.state.is_running() {
            return false;
        }
        self.state = ScanState::Failed {
            message: message.into(),
        };
        true
    }
}
