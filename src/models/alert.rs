use serde::Serialize;
use serde_json::Value;

const UNKNOWN: &str = "unknown";

/// Fields extracted from one Alertmanager notification entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertSummary {
    pub alertname: String,
    pub severity: String,
    pub status: String,
    pub starts_at: Option<String>,
    pub description: String,
}

impl AlertSummary {
    /// Extracts what it can from an arbitrary JSON value; missing or
    /// mistyped fields fall back to defaults.
    pub fn from_value(alert: &Value) -> Self {
        let text = |value: Option<&Value>, default: &str| {
            value
                .and_then(Value::as_str)
                .unwrap_or(default)
                .to_string()
        };
        let labels = alert.get("labels");
        let annotations = alert.get("annotations");

        Self {
            alertname: text(labels.and_then(|l| l.get("alertname")), UNKNOWN),
            severity: text(labels.and_then(|l| l.get("severity")), UNKNOWN),
            status: text(alert.get("status"), UNKNOWN),
            starts_at: alert
                .get("startsAt")
                .and_then(Value::as_str)
                .map(str::to_string),
            description: text(annotations.and_then(|a| a.get("summary")), ""),
        }
    }
}

/// Parses a webhook body into alert summaries. Anything that is not a JSON
/// object with an `alerts` array yields no alerts.
pub fn parse_alert_webhook(body: &[u8]) -> Vec<AlertSummary> {
    let payload: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(_) => return Vec::new(),
    };

    payload
        .get("alerts")
        .and_then(Value::as_array)
        .map(|alerts| alerts.iter().map(AlertSummary::from_value).collect())
        .unwrap_or_default()
}
