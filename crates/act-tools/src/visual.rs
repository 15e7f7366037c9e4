use std::time::Duration;

use act_bridge::Bridge;
use act_testkit::{BaselineStore, compare};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use serde_json::{Map, Value, json};

use crate::error::{Error, Result};

async fn capture_screenshot(bridge: &Bridge, timeout: Duration) -> Result<Vec<u8>> {
    let data = bridge
        .send_command("screenshot", Map::new(), timeout)
        .await?;
    let encoded = data
        .get("data")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::UnexpectedResponse("screenshot response missing data".to_string()))?;
    BASE64
        .decode(encoded)
        .map_err(|err| Error::UnexpectedResponse(format!("screenshot data not valid base64: {err}")))
}

/// `visual_compare` (spec.md §4.6 / §8 scenario 8): first run saves the
/// baseline and records no assertion; subsequent runs compare and record one.
pub async fn visual_compare(
    bridge: &Bridge,
    baselines: &BaselineStore,
    name: &str,
    threshold: f64,
    timeout: Duration,
) -> Result<Value> {
    let actual = capture_screenshot(bridge, timeout).await?;

    let Some(expected) = baselines.load(name)? else {
        baselines.save(name, &actual)?;
        return Ok(json!({"firstRun": true, "baselineSaved": true}));
    };

    let result = compare(&actual, &expected, threshold)?;
    if !result.is_match {
        match &result.diff_image_base64 {
            Some(diff_b64) => {
                let diff_bytes = BASE64.decode(diff_b64).map_err(|err| {
                    Error::UnexpectedResponse(format!("diff image not valid base64: {err}"))
                })?;
                baselines.save_diff(name, &diff_bytes)?;
            }
            // Dimension mismatch never produces a diff image; persist the
            // mismatched screenshot itself so there is still something to
            // inspect under diffs/.
            None => baselines.save_diff(name, &actual)?,
        }
    }
    Ok(serde_json::to_value(result).expect("CompareResult serializes"))
}

/// `visual_update`: take a screenshot and overwrite the baseline unconditionally.
pub async fn visual_update(
    bridge: &Bridge,
    baselines: &BaselineStore,
    name: &str,
    timeout: Duration,
) -> Result<Value> {
    let actual = capture_screenshot(bridge, timeout).await?;
    baselines.save(name, &actual)?;
    Ok(json!({"updated": true}))
}
