//! Pure projections of a [`DashboardSnapshot`] into displayable output.
//!
//! Nothing here reads back from the view or mutates state: every function
//! takes an immutable snapshot (or a part of one) and returns text.

use std::fmt::{self, Write as _};

use crate::dashboard::DashboardSnapshot;
use crate::latency::{ChartData, LatencyReadout};
use crate::scan::ScanState;
use crate::types::{HostResult, PortResult, ScanReport, SystemInfo};

pub const NO_OPEN_PORTS: &str = "No open ports detected";
pub const STATUS_PLACEHOLDER: &str = "Scan requested...";

/// One rendered port, e.g. `TCP/22 - ssh (OpenSSH 9.0)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortLine {
    pub label: String,
    pub service: String,
    pub version: Option<String>,
}

impl fmt::Display for PortLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.label, self.service)?;
        if let Some(v) = &self.version {
            write!(f, " ({v})")?;
        }
        Ok(())
    }
}

/// Port section of a host block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortsListing {
    NoOpenPorts,
    Ports(Vec<PortLine>),
}

/// Project a host's ports, keeping input order.
pub fn format_ports(ports: &[PortResult]) -> PortsListing {
    if ports.is_empty() {
        return PortsListing::NoOpenPorts;
    }
    PortsListing::Ports(
        ports
            .iter()
            .map(|p| PortLine {
                label: format!("{}/{}", p.protocol.to_uppercase(), p.port),
                service: p.service.clone(),
                version: p.version.clone(),
            })
            .collect(),
    )
}

/// Escape text for inclusion in HTML element content or attribute values.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn ports_html(ports: &[PortResult]) -> String {
    match format_ports(ports) {
        PortsListing::NoOpenPorts => {
            format!(r#"<p class="text-gray-500">{NO_OPEN_PORTS}</p>"#)
        }
        PortsListing::Ports(lines) => {
            let mut out = String::from(
                r#"<div class="mt-2"><p class="font-semibold">Open ports:</p><div class="grid grid-cols-1 gap-1 mt-1">"#,
            );
            for line in lines {
                let _ = write!(
                    out,
                    r#"<div class="bg-gray-50 p-2 rounded"><span class="font-medium">{}</span><span class="text-gray-600"> - {}</span>"#,
                    escape_html(&line.label),
                    escape_html(&line.service)
                );
                if let Some(v) = &line.version {
                    let _ = write!(
                        out,
                        r#"<span class="text-gray-500 text-sm"> ({})</span>"#,
                        escape_html(v)
                    );
                }
                out.push_str("</div>");
            }
            out.push_str("</div></div>");
            out
        }
    }
}

fn host_html(host: &HostResult) -> String {
    format!(
        r#"<div class="host p-4 bg-gray-50 rounded-lg border border-gray-200"><p class="font-bold text-lg">{}</p><p class="text-gray-600">IP: {}</p>{}</div>"#,
        escape_html(&host.hostname),
        escape_html(&host.ip),
        ports_html(&host.ports)
    )
}

fn success_html(report: &ScanReport) -> String {
    let mut out = String::from(
        r#"<div class="bg-green-100 border-l-4 border-green-500 text-green-700 p-4 mb-4"><p class="font-bold">Scan completed successfully</p>"#,
    );
    let _ = write!(out, "<p>Scanned at: {}</p>", escape_html(&report.timestamp));
    let _ = write!(out, "<p>Hosts detected: {}</p>", report.hosts.len());
    if let Some(network) = &report.network {
        let _ = write!(out, "<p>Network: {}</p>", escape_html(network));
    }
    if let Some(filename) = &report.filename {
        let _ = write!(out, "<p>Saved as: {}</p>", escape_html(filename));
    }
    out.push_str(r#"</div><div class="space-y-4">"#);
    for host in &report.hosts {
        out.push_str(&host_html(host));
    }
    out.push_str("</div>");
    out
}

/// Scan section: start control, spinner/status while running, outcome after.
pub fn render_scan_panel(state: &ScanState, control_enabled: bool) -> String {
    let button = if control_enabled {
        r#"<form method="post" action="/scan"><button id="start-scan" type="submit">Start network scan</button></form>"#.to_string()
    } else {
        r#"<button id="start-scan" class="opacity-50 cursor-not-allowed" disabled>Start network scan</button>"#.to_string()
    };
    let body = match state {
        ScanState::Idle => String::new(),
        ScanState::Running { progress } => format!(
            r#"<div id="scan-spinner" class="spinner"></div><p id="scan-status">{}</p>"#,
            escape_html(progress.as_deref().unwrap_or(STATUS_PLACEHOLDER))
        ),
        ScanState::Succeeded(report) => success_html(report),
        ScanState::Failed { message } => format!(
            r#"<div class="bg-red-100 border-l-4 border-red-500 text-red-700 p-4"><p class="font-bold">Scan failed</p><p>{}</p></div>"#,
            escape_html(message)
        ),
    };
    format!(r#"<section id="scan">{button}<div id="scan-results">{body}</div></section>"#)
}

pub fn render_latency_readout(readout: Option<&LatencyReadout>) -> String {
    match readout {
        Some(r) => format!(
            r#"<p id="wan-latency" class="text-2xl font-bold text-center {}">{}</p>"#,
            r.class.css_class(),
            r.text()
        ),
        None => r#"<p id="wan-latency" class="text-2xl font-bold text-center">--</p>"#.to_string(),
    }
}

pub fn render_system_info(info: Option<&SystemInfo>) -> String {
    match info {
        Some(i) => format!(
            r#"<div id="system-info"><p>Hostname: {}</p><p>IP address: {}</p><p>Version: {}</p></div>"#,
            escape_html(&i.hostname),
            escape_html(&i.ip),
            escape_html(&i.version)
        ),
        None => r#"<div id="system-info"></div>"#.to_string(),
    }
}

const CHART_W: f64 = 600.0;
const CHART_H: f64 = 200.0;

/// Line chart of the latency window as inline SVG.
///
/// Timed-out samples break the line and are marked in red on the baseline.
pub fn render_chart_svg(chart: &ChartData) -> String {
    let max = chart.values.iter().flatten().copied().max().unwrap_or(0).max(1) as f64;
    let step = if chart.values.len() > 1 {
        CHART_W / (chart.values.len() - 1) as f64
    } else {
        0.0
    };
    let mut out = format!(
        r#"<svg id="latencyChart" viewBox="0 0 {CHART_W} {CHART_H}" width="{CHART_W}" height="{CHART_H}" xmlns="http://www.w3.org/2000/svg">"#
    );
    let mut segment: Vec<String> = Vec::new();
    let flush = |segment: &mut Vec<String>, out: &mut String| {
        if !segment.is_empty() {
            let _ = write!(
                out,
                r#"<polyline fill="none" stroke="rgb(75,192,192)" stroke-width="2" points="{}"/>"#,
                segment.join(" ")
            );
            segment.clear();
        }
    };
    for (i, value) in chart.values.iter().enumerate() {
        let x = i as f64 * step;
        match value {
            Some(v) => {
                let y = CHART_H - (*v as f64 / max) * CHART_H;
                segment.push(format!("{x:.1},{y:.1}"));
            }
            None => {
                flush(&mut segment, &mut out);
                let _ = write!(
                    out,
                    r#"<circle class="timeout" cx="{x:.1}" cy="{CHART_H}" r="3" fill="red"/>"#
                );
            }
        }
    }
    flush(&mut segment, &mut out);
    out.push_str("</svg>");
    out
}

/// Complete HTML document for the embedded web UI.
pub fn render_page(snapshot: &DashboardSnapshot, refresh_secs: u64) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta http-equiv="refresh" content="{refresh_secs}">
<title>Network dashboard</title>
</head>
<body>
<h2>System</h2>
{info}
<h2>Network scan</h2>
{scan}
<h2>WAN latency</h2>
{readout}
{chart}
</body>
</html>
"#,
        info = render_system_info(snapshot.system_info.as_ref()),
        scan = render_scan_panel(&snapshot.scan, snapshot.control_enabled),
        readout = render_latency_readout(snapshot.readout.as_ref()),
        chart = render_chart_svg(&snapshot.latency),
    )
}

/// Plain-text rendering for terminals and logs.
pub fn render_text(snapshot: &DashboardSnapshot) -> String {
    let mut out = String::new();
    if let Some(info) = &snapshot.system_info {
        let _ = writeln!(out, "System: {} ({}) v{}", info.hostname, info.ip, info.version);
    }
    match &snapshot.scan {
        ScanState::Idle => {
            let _ = writeln!(out, "Scan: idle");
        }
        ScanState::Running { progress } => {
            let _ = writeln!(
                out,
                "Scan: running - {}",
                progress.as_deref().unwrap_or(STATUS_PLACEHOLDER)
            );
        }
        ScanState::Succeeded(report) => {
            let _ = writeln!(out, "Scan: completed at {}", report.timestamp);
            let _ = writeln!(out, "Hosts detected: {}", report.hosts.len());
            for host in &report.hosts {
                let _ = writeln!(out, "  {} ({})", host.hostname, host.ip);
                match format_ports(&host.ports) {
                    PortsListing::NoOpenPorts => {
                        let _ = writeln!(out, "    {NO_OPEN_PORTS}");
                    }
                    PortsListing::Ports(lines) => {
                        for line in lines {
                            let _ = writeln!(out, "    {line}");
                        }
                    }
                }
            }
        }
        ScanState::Failed { message } => {
            let _ = writeln!(out, "Scan: failed - {message}");
        }
    }
    let readout = snapshot
        .readout
        .as_ref()
        .map(LatencyReadout::text)
        .unwrap_or_else(|| "--".to_string());
    let _ = writeln!(
        out,
        "WAN latency: {readout} ({} samples)",
        snapshot.latency.values.len()
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::latency::{LatencyClass, LatencyThresholds};

    fn port(protocol: &str, port: u16, service: &str, version: Option<&str>) -> PortResult {
        PortResult {
            protocol: protocol.into(),
            port,
            service: service.into(),
            version: version.map(str::to_string),
        }
    }

    #[test]
    fn empty_ports_give_indicator() {
        assert_eq!(format_ports(&[]), PortsListing::NoOpenPorts);
        assert!(ports_html(&[]).contains(NO_OPEN_PORTS));
    }

    #[test]
    fn ports_keep_input_order_and_optional_version() {
        let listing = format_ports(&[
            port("udp", 161, "snmp", None),
            port("tcp", 22, "ssh", Some("OpenSSH 9.0")),
        ]);
        let PortsListing::Ports(lines) = listing else {
            panic!("expected ports");
        };
        let rendered: Vec<String> = lines.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["UDP/161 - snmp", "TCP/22 - ssh (OpenSSH 9.0)"]);
    }

    #[test]
    fn html_is_escaped() {
        let host = HostResult {
            ip: "10.0.0.1".into(),
            hostname: "<script>".into(),
            ports: vec![],
        };
        let html = host_html(&host);
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn running_panel_disables_control_and_shows_placeholder() {
        let html = render_scan_panel(&ScanState::Running { progress: None }, false);
        assert!(html.contains("disabled"));
        assert!(html.contains("scan-spinner"));
        assert!(html.contains(STATUS_PLACEHOLDER));
    }

    #[test]
    fn failed_panel_shows_message() {
        let html = render_scan_panel(
            &ScanState::Failed {
                message: "nmap missing".into(),
            },
            true,
        );
        assert!(html.contains("nmap missing"));
        assert!(!html.contains("disabled"));
    }

    #[test]
    fn readout_uses_class_colour() {
        let r = LatencyReadout::new(Some(150), &LatencyThresholds::default());
        assert_eq!(r.class, LatencyClass::Degraded);
        let html = render_latency_readout(Some(&r));
        assert!(html.contains("text-yellow-500") && html.contains("150 ms"));
    }

    #[test]
    fn chart_breaks_line_on_timeout() {
        let chart = ChartData {
            labels: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            values: vec![Some(10), Some(20), None, Some(30)],
        };
        let svg = render_chart_svg(&chart);
        assert_eq!(svg.matches("<polyline").count(), 2);
        assert_eq!(svg.matches(r#"class="timeout""#).count(), 1);
    }

    #[test]
    fn empty_chart_is_valid_svg() {
        let svg = render_chart_svg(&ChartData::default());
        assert!(svg.starts_with("<svg") && svg.ends_with("</svg>"));
    }
}
