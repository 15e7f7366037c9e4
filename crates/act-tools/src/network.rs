use std::time::Duration;

use act_bridge::Bridge;
use serde_json::{Map, Value, json};

use crate::error::Result;

/// `network_assert` (spec.md §4.6): stopping the capture is a side effect of
/// asserting, by design — it always runs before the scan.
pub async fn network_assert(
    bridge: &Bridge,
    url_contains: &str,
    method: Option<&str>,
    status: Option<i64>,
    timeout: Duration,
) -> Result<Value> {
    let data = bridge
        .send_command("network_capture_stop", Map::new(), timeout)
        .await?;
    let requests = data
        .get("requests")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let total_captured = requests.len();

    let matched = requests.into_iter().find(|request| {
        let url_matches = request
            .get("url")
            .and_then(Value::as_str)
            .is_some_and(|url| url.contains(url_contains));
        let method_matches = method.is_none_or(|expected| {
            request
                .get("method")
                .and_then(Value::as_str)
                .is_some_and(|actual| actual.eq_ignore_ascii_case(expected))
        });
        let status_matches = status.is_none_or(|expected| {
            request.get("status").and_then(Value::as_i64) == Some(expected)
        });
        url_matches && method_matches && status_matches
    });

    let passed = matched.is_some();
    Ok(json!({
        "passed": passed,
        "matchedRequest": matched,
        "totalCaptured": total_captured,
    }))
}
