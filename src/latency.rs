//! Sliding window of WAN latency samples feeding the live chart.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use time::{macros::format_description, OffsetDateTime};

/// Default number of samples kept in the window.
pub const DEFAULT_WINDOW: usize = 50;

/// Raw probe value the backend uses for a timed-out ping.
pub const TIMEOUT_SENTINEL: f64 = -1.0;

/// One probe result. `value_ms` is `None` for a timed-out probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LatencySample {
    pub time_label: String,
    pub value_ms: Option<u64>,
}

/// Translate a raw probe value into a stored latency.
///
/// The timeout sentinel (and any other negative value) maps to `None`.
/// Fractional milliseconds are rounded to the nearest whole millisecond.
pub fn translate_latency(raw: f64) -> Option<u64> {
    if raw < 0.0 || !raw.is_finite() {
        None
    } else {
        Some(raw.round() as u64)
    }
}

/// Fixed-capacity FIFO of latency samples in arrival order.
#[derive(Debug, Clone)]
pub struct LatencySeriesBuffer {
    capacity: usize,
    samples: VecDeque<LatencySample>,
}

impl Default for LatencySeriesBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl LatencySeriesBuffer {
    /// Create an empty window. A capacity of zero is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity + 1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Append a sample, evicting the oldest one once the window is full.
    pub fn append(&mut self, time_label: impl Into<String>, value_ms: Option<u64>) {
        self.samples.push_back(LatencySample {
            time_label: time_label.into(),
            value_ms,
        });
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Append a raw probe value, applying the sentinel translation first.
    /// Returns the stored value.
    pub fn append_raw(&mut self, time_label: impl Into<String>, raw: f64) -> Option<u64> {
        let value = translate_latency(raw);
        self.append(time_label, value);
        value
    }

    /// Current samples, oldest first.
    pub fn current_series(&self) -> impl ExactSizeIterator<Item = &LatencySample> + '_ {
        self.samples.iter()
    }

    pub fn latest(&self) -> Option<&LatencySample> {
        self.samples.back()
    }

    /// Labels and values as parallel arrays, the shape a line chart consumes.
    pub fn chart_data(&self) -> ChartData {
        let (labels, values) = self
            .samples
            .iter()
            .map(|s| (s.time_label.clone(), s.value_ms))
            .unzip();
        ChartData { labels, values }
    }
}

/// Parallel label/value arrays; `None` renders as a gap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub values: Vec<Option<u64>>,
}

/// Colour bucket of the instantaneous readout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LatencyClass {
    Good,
    Degraded,
    Poor,
    Timeout,
}

impl LatencyClass {
    /// Tailwind-style text colour used by the web view.
    pub fn css_class(&self) -> &'static str {
        match self {
            LatencyClass::Good => "text-green-500",
            LatencyClass::Degraded => "text-yellow-500",
            LatencyClass::Poor | LatencyClass::Timeout => "text-red-500",
        }
    }
}

/// Readout colour thresholds, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatencyThresholds {
    /// Values strictly below this are `Good`.
    pub good_below_ms: u64,
    /// Values strictly below this (and not `Good`) are `Degraded`; the rest are `Poor`.
    pub degraded_below_ms: u64,
}

impl Default for LatencyThresholds {
    fn default() -> Self {
        Self {
            good_below_ms: 100,
            degraded_below_ms: 200,
        }
    }
}

impl LatencyThresholds {
    pub fn classify(&self, value_ms: Option<u64>) -> LatencyClass {
        match value_ms {
            None => LatencyClass::Timeout,
            Some(v) if v < self.good_below_ms => LatencyClass::Good,
            Some(v) if v < self.degraded_below_ms => LatencyClass::Degraded,
            Some(_) => LatencyClass::Poor,
        }
    }
}

/// The instantaneous latency display next to the chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LatencyReadout {
    pub value_ms: Option<u64>,
    pub class: LatencyClass,
}

impl LatencyReadout {
    pub fn new(value_ms: Option<u64>, thresholds: &LatencyThresholds) -> Self {
        Self {
            value_ms,
            class: thresholds.classify(value_ms),
        }
    }

    /// `"42 ms"`, or `"Timeout"` for a lost probe.
    pub fn text(&self) -> String {
        match self.value_ms {
            Some(v) => format!("{v} ms"),
            None => "Timeout".to_string(),
        }
    }
}

/// Local wall-clock label for a sample arriving now, e.g. `14:03:27`.
pub fn now_time_label() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_else(|_| String::from("00:00:00"))
}
