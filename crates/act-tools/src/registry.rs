use serde_json::{Value, json};

use crate::types::ToolSpec;

/// How a tool's call maps onto the Bridge Core and its collaborators.
#[derive(Debug, Clone, Copy)]
pub enum ToolKind {
    /// Forwarded to the peer uninterpreted, under its own command name.
    PassThrough(&'static str),
    AssertElement,
    AssertText,
    AssertUrl,
    AssertCount,
    VisualCompare,
    VisualUpdate,
    NetworkAssert,
    SessionStart,
    SessionEnd,
}

/// One catalogued tool: its public spec plus how to route a call to it.
pub struct Tool {
    pub spec: ToolSpec,
    pub kind: ToolKind,
}

fn pass_through(command: &'static str, description: &str, params: Value) -> Tool {
    Tool {
        spec: ToolSpec {
            name: format!("browser_{command}"),
            description: description.to_string(),
            input_schema: params,
        },
        kind: ToolKind::PassThrough(command),
    }
}

fn schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// The full set of tools exposed to the agent channel (spec.md §4.6): one
/// pass-through tool per forwarded command, plus the composed assertion,
/// visual-regression, network, and session tools.
pub fn build_catalog() -> Vec<Tool> {
    let selector_tab = schema(
        json!({
            "selector": {"type": "string", "description": "CSS selector"},
            "tabId": {"type": "integer"},
        }),
        &["selector"],
    );
    let empty = schema(json!({"tabId": {"type": "integer"}}), &[]);

    let mut tools = vec![
        pass_through("ping", "Keepalive probe; returns {pong: true}.", empty.clone()),
        pass_through(
            "navigate",
            "Navigate the active tab to a URL allowed by the origin allowlist.",
            schema(json!({"url": {"type": "string"}, "tabId": {"type": "integer"}}), &["url"]),
        ),
        pass_through("screenshot", "Capture a PNG screenshot of the active tab.", empty.clone()),
        pass_through(
            "evaluate",
            "Evaluate a JavaScript expression in the active tab.",
            schema(json!({"code": {"type": "string"}, "tabId": {"type": "integer"}}), &["code"]),
        ),
        pass_through("url", "Read the active tab's current URL.", empty.clone()),
        pass_through("title", "Read the active tab's document title.", empty.clone()),
        pass_through(
            "network_capture_start",
            "Begin capturing request metadata (no bodies) for the active tab.",
            empty.clone(),
        ),
        pass_through(
            "network_capture_stop",
            "Stop capturing and return the captured request metadata.",
            empty.clone(),
        ),
        pass_through("click", "Click the element matching a selector.", selector_tab.clone()),
        pass_through(
            "type",
            "Type text into the element matching a selector.",
            schema(
                json!({"selector": {"type": "string"}, "text": {"type": "string"}, "tabId": {"type": "integer"}}),
                &["selector", "text"],
            ),
        ),
        pass_through(
            "select",
            "Choose an option in a <select> matching a selector.",
            schema(
                json!({"selector": {"type": "string"}, "value": {"type": "string"}, "tabId": {"type": "integer"}}),
                &["selector", "value"],
            ),
        ),
        pass_through("hover", "Hover the element matching a selector.", selector_tab.clone()),
        pass_through(
            "scroll",
            "Scroll the page or an element into view.",
            schema(
                json!({"selector": {"type": "string"}, "x": {"type": "number"}, "y": {"type": "number"}, "tabId": {"type": "integer"}}),
                &[],
            ),
        ),
        pass_through(
            "key",
            "Send a keyboard event to the active tab.",
            schema(json!({"key": {"type": "string"}, "tabId": {"type": "integer"}}), &["key"]),
        ),
        pass_through(
            "wait",
            "Wait for a selector or a fixed duration.",
            schema(
                json!({"selector": {"type": "string"}, "timeoutMs": {"type": "integer"}, "tabId": {"type": "integer"}}),
                &[],
            ),
        ),
        pass_through("query", "Report whether a selector matches and is visible.", selector_tab.clone()),
        pass_through("query_all", "Count elements matching a selector.", selector_tab.clone()),
        pass_through("text", "Read the text content of a selector.", selector_tab.clone()),
        pass_through("html", "Read the outer HTML of a selector.", selector_tab),
    ];

    tools.push(Tool {
        spec: ToolSpec {
            name: "assert_element".to_string(),
            description: "Assert an element's existence or visibility and record it on the active session."
                .to_string(),
            input_schema: schema(
                json!({
                    "selector": {"type": "string"},
                    "op": {"type": "string", "enum": ["exists", "not_exists", "visible", "hidden"]},
                    "tabId": {"type": "integer"},
                }),
                &["selector", "op"],
            ),
        },
        kind: ToolKind::AssertElement,
    });
    tools.push(Tool {
        spec: ToolSpec {
            name: "assert_text".to_string(),
            description: "Assert an element's text content and record it on the active session.".to_string(),
            input_schema: schema(
                json!({
                    "selector": {"type": "string"},
                    "op": {"type": "string", "enum": ["contains", "equals", "matches"]},
                    "expected": {"type": "string"},
                    "tabId": {"type": "integer"},
                }),
                &["selector", "op", "expected"],
            ),
        },
        kind: ToolKind::AssertText,
    });
    tools.push(Tool {
        spec: ToolSpec {
            name: "assert_url".to_string(),
            description: "Assert the active tab's URL and record it on the active session.".to_string(),
            input_schema: schema(
                json!({
                    "op": {"type": "string", "enum": ["contains", "equals", "matches"]},
                    "expected": {"type": "string"},
                }),
                &["op", "expected"],
            ),
        },
        kind: ToolKind::AssertUrl,
    });
    tools.push(Tool {
        spec: ToolSpec {
            name: "assert_count".to_string(),
            description: "Assert the number of elements matching a selector and record it on the active session."
                .to_string(),
            input_schema: schema(
                json!({
                    "selector": {"type": "string"},
                    "op": {"type": "string", "enum": ["equals", "greaterThan", "lessThan", "atLeast", "atMost"]},
                    "expected": {"type": "integer"},
                    "tabId": {"type": "integer"},
                }),
                &["selector", "op", "expected"],
            ),
        },
        kind: ToolKind::AssertCount,
    });
    tools.push(Tool {
        spec: ToolSpec {
            name: "visual_compare".to_string(),
            description: "Compare a fresh screenshot against a named baseline, saving it on first run."
                .to_string(),
            input_schema: schema(
                json!({
                    "name": {"type": "string"},
                    "threshold": {"type": "number", "minimum": 0, "maximum": 1, "default": 0.1},
                }),
                &["name"],
            ),
        },
        kind: ToolKind::VisualCompare,
    });
    tools.push(Tool {
        spec: ToolSpec {
            name: "visual_update".to_string(),
            description: "Take a screenshot and overwrite a named baseline unconditionally.".to_string(),
            input_schema: schema(json!({"name": {"type": "string"}}), &["name"]),
        },
        kind: ToolKind::VisualUpdate,
    });
    tools.push(Tool {
        spec: ToolSpec {
            name: "network_assert".to_string(),
            description: "Stop the ongoing network capture and assert a matching request occurred.".to_string(),
            input_schema: schema(
                json!({
                    "urlContains": {"type": "string"},
                    "method": {"type": "string"},
                    "status": {"type": "integer"},
                }),
                &["urlContains"],
            ),
        },
        kind: ToolKind::NetworkAssert,
    });
    tools.push(Tool {
        spec: ToolSpec {
            name: "session_start".to_string(),
            description: "Begin a named test session, resetting the assertion buffer.".to_string(),
            input_schema: schema(json!({"name": {"type": "string"}}), &["name"]),
        },
        kind: ToolKind::SessionStart,
    });
    tools.push(Tool {
        spec: ToolSpec {
            name: "session_end".to_string(),
            description: "End the active test session and return its summary.".to_string(),
            input_schema: schema(json!({}), &[]),
        },
        kind: ToolKind::SessionEnd,
    });

    tools
}
