use serde::{Deserialize, Deserializer, Serialize};

/// One open port reported for a host.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PortResult {
    pub protocol: String,
    pub port: u16,
    pub service: String,
    /// Service version banner. The backend sends `""` when nmap found none.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub version: Option<String>,
}

/// One live host found by a scan.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct HostResult {
    pub ip: String,
    pub hostname: String,
    #[serde(default)]
    pub ports: Vec<PortResult>,
}

/// Payload of the `scan_results` event.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub timestamp: String,
    #[serde(default)]
    pub hosts: Vec<HostResult>,
    /// Scanned network in CIDR notation, when the backend includes it.
    #[serde(default)]
    pub network: Option<String>,
    /// Name of the file the backend saved the results under.
    #[serde(default)]
    pub filename: Option<String>,
}

/// Static facts about the backend machine, served by `GET /system_info`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SystemInfo {
    pub hostname: String,
    pub ip: String,
    pub version: String,
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_version_becomes_none() {
        let p: PortResult =
            serde_json::from_str(r#"{"protocol":"tcp","port":80,"service":"http","version":""}"#)
                .unwrap();
        assert_eq!(p.version, None);
    }

    #[test]
    fn missing_optional_fields_default() {
        let r: ScanReport = serde_json::from_str(r#"{"timestamp":"T1"}"#).unwrap();
        assert!(r.hosts.is_empty());
        assert!(r.network.is_none() && r.filename.is_none());
    }
}
