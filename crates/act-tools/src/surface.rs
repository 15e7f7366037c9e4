use std::{sync::Arc, time::Duration};

use act_bridge::Bridge;
use act_testkit::{BaselineStore, TestSession};
use serde_json::{Map, Value, json};

use crate::{
    assertions::{CountOp, ElementOp, TextOp, as_i64, as_str, truncate_for_safety},
    error::{Error, Result},
    network, registry,
    registry::{Tool, ToolKind},
    types::ToolSpec,
    visual,
};

/// The Tool Surface (spec.md §4.6): routes named tool calls to the Bridge
/// Core, the Test Session, and the Baseline Store + Image Comparator.
pub struct ToolSurface {
    bridge: Arc<Bridge>,
    session: Arc<TestSession>,
    baselines: Arc<BaselineStore>,
    tools: Vec<Tool>,
    timeout: Duration,
}

impl ToolSurface {
    pub fn new(bridge: Arc<Bridge>, session: Arc<TestSession>, baselines: Arc<BaselineStore>) -> Self {
        Self {
            bridge,
            session,
            baselines,
            tools: registry::build_catalog(),
            timeout: Duration::from_millis(act_protocol::DEFAULT_TIMEOUT_MS),
        }
    }

    /// The catalogue advertised to `tools/list`.
    pub fn catalog(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|tool| tool.spec.clone()).collect()
    }

    fn find(&self, name: &str) -> Result<&Tool> {
        self.tools
            .iter()
            .find(|tool| tool.spec.name == name)
            .ok_or_else(|| Error::UnknownTool(name.to_string()))
    }

    /// Dispatch one tool call and shape its result for the agent channel.
    pub async fn call(&self, name: &str, arguments: Value) -> Result<Value> {
        let tool = self.find(name)?;
        let params = arguments.as_object().cloned().unwrap_or_default();
        match tool.kind {
            ToolKind::PassThrough(command) => self.pass_through(command, params).await,
            ToolKind::AssertElement => self.assert_element(&Value::Object(params)).await,
            ToolKind::AssertText => self.assert_text(&Value::Object(params)).await,
            ToolKind::AssertUrl => self.assert_url(&Value::Object(params)).await,
            ToolKind::AssertCount => self.assert_count(&Value::Object(params)).await,
            ToolKind::VisualCompare => self.visual_compare(&Value::Object(params)).await,
            ToolKind::VisualUpdate => self.visual_update(&Value::Object(params)).await,
            ToolKind::NetworkAssert => self.network_assert(&Value::Object(params)).await,
            ToolKind::SessionStart => self.session_start(&Value::Object(params)),
            ToolKind::SessionEnd => self.session_end(),
        }
    }

    async fn pass_through(&self, command: &str, params: Map<String, Value>) -> Result<Value> {
        Ok(self.bridge.send_command(command, params, self.timeout).await?)
    }

    async fn read_element(&self, selector: &str, tab_id: Option<i64>) -> Result<(bool, bool)> {
        let mut params = Map::new();
        params.insert("selector".to_string(), json!(selector));
        if let Some(tab_id) = tab_id {
            params.insert("tabId".to_string(), json!(tab_id));
        }
        let data = self.bridge.send_command("query", params, self.timeout).await?;
        let exists = data.get("exists").and_then(Value::as_bool).unwrap_or(false);
        let visible = data.get("visible").and_then(Value::as_bool).unwrap_or(false);
        Ok((exists, visible))
    }

    async fn assert_element(&self, params: &Value) -> Result<Value> {
        let selector = as_str(params, "selector")?;
        let op = ElementOp::parse(as_str(params, "op")?)?;
        let tab_id = params.get("tabId").and_then(Value::as_i64);

        let (passed, actual) = match self.read_element(selector, tab_id).await {
            Ok((exists, visible)) => (op.evaluate(exists, visible), json!({"exists": exists, "visible": visible})),
            Err(_) => (op.passes_on_read_failure(), Value::Null),
        };
        self.session
            .add_assertion(passed, format!("assert_element({selector})"));
        Ok(json!({"passed": passed, "op": as_str(params, "op")?, "expected": Value::Null, "actual": actual}))
    }

    async fn assert_text(&self, params: &Value) -> Result<Value> {
        let selector = as_str(params, "selector")?;
        let op = TextOp::parse(as_str(params, "op")?)?;
        let expected = as_str(params, "expected")?;
        let tab_id = params.get("tabId").and_then(Value::as_i64);

        let mut command_params = Map::new();
        command_params.insert("selector".to_string(), json!(selector));
        if let Some(tab_id) = tab_id {
            command_params.insert("tabId".to_string(), json!(tab_id));
        }
        let read = self.bridge.send_command("text", command_params, self.timeout).await;
        let (passed, actual) = match read {
            Ok(data) => {
                let actual = data
                    .get("text")
                    .and_then(Value::as_str)
                    .ok_or_else(|| Error::UnexpectedResponse("text response missing text".to_string()))?;
                (op.evaluate(actual, expected)?, Value::String(truncate_for_safety(actual)))
            }
            Err(_) => (false, Value::Null),
        };
        self.session
            .add_assertion(passed, format!("assert_text({selector})"));
        Ok(json!({
            "passed": passed,
            "op": as_str(params, "op")?,
            "expected": expected,
            "actual": actual,
        }))
    }

    async fn assert_url(&self, params: &Value) -> Result<Value> {
        let op = TextOp::parse(as_str(params, "op")?)?;
        let expected = as_str(params, "expected")?;

        let read = self.bridge.send_command("url", Map::new(), self.timeout).await;
        let (passed, actual) = match read {
            Ok(data) => {
                let actual = data
                    .get("url")
                    .and_then(Value::as_str)
                    .ok_or_else(|| Error::UnexpectedResponse("url response missing url".to_string()))?;
                (op.evaluate(actual, expected)?, Value::String(truncate_for_safety(actual)))
            }
            Err(_) => (false, Value::Null),
        };
        self.session.add_assertion(passed, format!("assert_url({expected})"));
        Ok(json!({
            "passed": passed,
            "op": as_str(params, "op")?,
            "expected": expected,
            "actual": actual,
        }))
    }

    async fn assert_count(&self, params: &Value) -> Result<Value> {
        let selector = as_str(params, "selector")?;
        let op = CountOp::parse(as_str(params, "op")?)?;
        let expected = as_i64(params, "expected")?;
        let tab_id = params.get("tabId").and_then(Value::as_i64);

        let mut command_params = Map::new();
        command_params.insert("selector".to_string(), json!(selector));
        if let Some(tab_id) = tab_id {
            command_params.insert("tabId".to_string(), json!(tab_id));
        }
        let read = self
            .bridge
            .send_command("query_all", command_params, self.timeout)
            .await;
        let (passed, actual) = match read {
            Ok(data) => {
                let actual = data
                    .get("count")
                    .and_then(Value::as_i64)
                    .ok_or_else(|| Error::UnexpectedResponse("query_all response missing count".to_string()))?;
                (op.evaluate(actual, expected), Value::from(actual))
            }
            Err(_) => (false, Value::Null),
        };
        self.session
            .add_assertion(passed, format!("assert_count({selector})"));
        Ok(json!({"passed": passed, "op": as_str(params, "op")?, "expected": expected, "actual": actual}))
    }

    async fn visual_compare(&self, params: &Value) -> Result<Value> {
        let name = as_str(params, "name")?;
        let threshold = params.get("threshold").and_then(Value::as_f64).unwrap_or(0.1);
        let result = visual::visual_compare(&self.bridge, &self.baselines, name, threshold, self.timeout).await?;
        if let Some(is_match) = result.get("match").and_then(Value::as_bool) {
            self.session.add_assertion(is_match, format!("visual_compare({name})"));
        }
        Ok(result)
    }

    async fn visual_update(&self, params: &Value) -> Result<Value> {
        let name = as_str(params, "name")?;
        visual::visual_update(&self.bridge, &self.baselines, name, self.timeout).await
    }

    async fn network_assert(&self, params: &Value) -> Result<Value> {
        let url_contains = as_str(params, "urlContains")?;
        let method = params.get("method").and_then(Value::as_str);
        let status = params.get("status").and_then(Value::as_i64);
        let result = network::network_assert(&self.bridge, url_contains, method, status, self.timeout).await?;
        if let Some(passed) = result.get("passed").and_then(Value::as_bool) {
            self.session
                .add_assertion(passed, format!("network_assert({url_contains})"));
        }
        Ok(result)
    }

    fn session_start(&self, params: &Value) -> Result<Value> {
        let name = as_str(params, "name")?;
        self.session.start(name);
        Ok(json!({"started": true, "name": name}))
    }

    fn session_end(&self) -> Result<Value> {
        let summary = self.session.end();
        Ok(serde_json::to_value(summary).expect("SessionSummary serializes"))
    }
}
