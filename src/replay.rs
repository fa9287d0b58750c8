//! Offline replay of recorded events.
//!
//! A replay file holds one JSON envelope per line, e.g.
//!
//! ```text
//! {"event": "start_scan"}
//! {"event": "scan_status", "data": {"status": "scanning"}}
//! {"event": "wan_latency", "data": {"latency": 18}}
//! ```
//!
//! `start_scan` stands for the user pressing the start control. An optional
//! `"time"` field on a `wan_latency` line becomes the sample's chart label.
//! Blank lines, lines starting with `#` and unknown event names are skipped.

use std::path::Path;

use anyhow::{Context, Result};

use crate::dashboard::{Dashboard, DashboardInput};
use crate::events::{Envelope, EventError, InboundEvent, START_SCAN};

/// Parse replay file content into dashboard inputs, in file order.
pub fn parse_replay_str(s: &str) -> Result<Vec<DashboardInput>> {
    let mut out = Vec::new();
    for (idx, raw_line) in s.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut env: Envelope = serde_json::from_str(line)
            .with_context(|| format!("line {line_no}: invalid event envelope"))?;
        if env.event == START_SCAN {
            out.push(DashboardInput::StartRequested);
            continue;
        }
        let time = env.time.take();
        let event = match InboundEvent::try_from(env) {
            Ok(event) => event,
            Err(EventError::Unknown(name)) => {
                tracing::debug!(line = line_no, event = %name, "Ignoring unknown event");
                continue;
            }
            Err(e) => return Err(e).with_context(|| format!("line {line_no}")),
        };
        out.push(match (event, time) {
            (InboundEvent::WanLatency { latency }, Some(time_label)) => {
                DashboardInput::LatencyAt {
                    time_label,
                    latency,
                }
            }
            (event, _) => DashboardInput::Event(event),
        });
    }
    Ok(out)
}

pub fn load_replay_from_path(path: impl AsRef<Path>) -> Result<Vec<DashboardInput>> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("failed to read replay file: {}", path.as_ref().display()))?;
    parse_replay_str(&content)
}

/// Feed inputs through `dashboard` synchronously. Returns how many start
/// requests were accepted (i.e. how many `start_scan` events would be sent).
pub fn replay(dashboard: &mut Dashboard, inputs: Vec<DashboardInput>) -> usize {
    inputs
        .into_iter()
        .filter_map(|input| dashboard.apply(input))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::ScanPhase;

    #[test]
    fn parses_and_skips_comments() {
        let input = r#"
            # recorded session
            {"event": "start_scan"}
            {"event": "scan_status", "data": {"status": "scanning"}}

            {"event": "wan_latency", "data": {"latency": 12.4}}
        "#;
        let inputs = parse_replay_str(input).unwrap();
        assert_eq!(inputs.len(), 3);
        assert_eq!(inputs[0], DashboardInput::StartRequested);
    }

    #[test]
    fn bad_line_reports_line_number() {
        let err = parse_replay_str("{\"event\":\"start_scan\"}\nnot json\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn unknown_events_are_skipped() {
        let inputs = parse_replay_str(
            r#"{"event":"start_scan"}
               {"event":"cpu_load","data":{"load":0.4}}
               {"event":"scan_error","data":{"error":"boom"}}"#,
        )
        .unwrap();
        assert_eq!(inputs.len(), 2);
        let mut d = Dashboard::default();
        replay(&mut d, inputs);
        assert_eq!(d.scan().state().error(), Some("boom"));
    }

    #[test]
    fn bad_payload_still_fails() {
        let err = parse_replay_str(r#"{"event":"wan_latency","data":{"latency":"fast"}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn recorded_time_labels_are_kept() {
        let inputs = parse_replay_str(
            r#"{"event":"wan_latency","time":"14:03:27","data":{"latency":18}}
               {"event":"wan_latency","time":"14:03:32","data":{"latency":-1}}"#,
        )
        .unwrap();
        let mut d = Dashboard::default();
        replay(&mut d, inputs);
        let chart = d.latency().chart_data();
        assert_eq!(chart.labels, vec!["14:03:27", "14:03:32"]);
        assert_eq!(chart.values, vec![Some(18), None]);
    }

    #[test]
    fn replay_counts_accepted_starts() {
        let inputs = parse_replay_str(
            r#"{"event":"start_scan"}
               {"event":"start_scan"}
               {"event":"scan_error","data":{"error":"boom"}}
               {"event":"start_scan"}"#,
        )
        .unwrap();
        let mut d = Dashboard::default();
        assert_eq!(replay(&mut d, inputs), 2);
        assert_eq!(d.scan().state().phase(), ScanPhase::Running);
    }
}
