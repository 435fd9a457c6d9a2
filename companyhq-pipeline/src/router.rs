/// Action router
///
/// Resolves an `{action, payload, options}` envelope to the name of the tool
/// that should handle it. Routing is pure: nothing is executed here.
///
/// A missing or blank action means `full_pipeline`. An action outside
/// [`KNOWN_ACTIONS`] also resolves to `full_pipeline`; the metadata marks
/// that case with `fallback: true` so callers can reject it if they need
/// strict input.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Default action and fallback tool
pub const FULL_PIPELINE: &str = "full_pipeline";

pub const HEALTH_CHECK: &str = "health_check";

/// Every action the router resolves to itself
pub const KNOWN_ACTIONS: [&str; 7] = [
    FULL_PIPELINE,
    HEALTH_CHECK,
    "ingest_data",
    "clean_data",
    "analyze",
    "generate_report",
    "send_payload",
];

const QUERY_INSTRUCTIONS: &str =
    "Answer the query using the most recent pipeline report. Be concise and cite figures from the report.";

/// Inbound action envelope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub action: Option<String>,

    #[serde(default)]
    pub payload: Map<String, JsonValue>,

    #[serde(default)]
    pub options: Map<String, JsonValue>,
}

impl Envelope {
    pub fn for_action(action: impl Into<String>) -> Self {
        Envelope {
            action: Some(action.into()),
            ..Default::default()
        }
    }

    /// Envelope for a free-text AI query
    pub fn for_query(query: impl Into<String>) -> Self {
        let mut payload = Map::new();
        payload.insert("query".to_string(), JsonValue::String(query.into()));
        Envelope {
            action: Some(FULL_PIPELINE.to_string()),
            payload,
            options: Map::new(),
        }
    }

    /// Parses a request body; anything that isn't a valid envelope is `{}`
    pub fn from_body(body: &[u8]) -> Self {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Envelope::default();
        }
        serde_json::from_slice(body).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "Ignoring malformed trigger body");
            Envelope::default()
        })
    }
}

/// How an envelope was resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteMetadata {
    /// Action as requested (after the default was applied)
    pub action: String,

    /// True when the action was unknown and `full_pipeline` was substituted
    pub fallback: bool,

    pub options: Map<String, JsonValue>,
}

/// Packaging of a free-text query for downstream consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedPayload {
    pub query: String,
    pub tool: String,
    pub instructions: String,
}

/// Router output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteResult {
    pub tool: String,
    pub route: RouteMetadata,
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_payload: Option<FormattedPayload>,
}

pub fn is_known_action(action: &str) -> bool {
    KNOWN_ACTIONS.contains(&action)
}

/// Resolves `envelope` to a tool
pub fn route(envelope: &Envelope) -> RouteResult {
    let action = envelope
        .action
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .unwrap_or(FULL_PIPELINE)
        .to_string();

    let fallback = !is_known_action(&action);
    let tool = if fallback {
        FULL_PIPELINE.to_string()
    } else {
        action.clone()
    };

    let message = if fallback {
        tracing::warn!(action = %action, "Unknown action, falling back to full_pipeline");
        format!("Unknown action '{}', running {}", action, FULL_PIPELINE)
    } else {
        format!("Routed to {}", tool)
    };

    let formatted_payload = envelope
        .payload
        .get("query")
        .and_then(JsonValue::as_str)
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(|query| FormattedPayload {
            query: query.to_string(),
            tool: tool.clone(),
            instructions: QUERY_INSTRUCTIONS.to_string(),
        });

    tracing::debug!(action = %action, tool = %tool, fallback, "Routed envelope");

    RouteResult {
        tool,
        route: RouteMetadata {
            action,
            fallback,
            options: envelope.options.clone(),
        },
        message,
        formatted_payload,
    }
}
