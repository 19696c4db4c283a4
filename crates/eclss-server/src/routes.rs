//! Client-facing routes for the dashboard, alert panel and action buttons.
//!
//! Transport-agnostic: a host HTTP server forwards method, path and body and
//! writes back the returned status code and JSON.

use eclss_core::clock::Clock;
use eclss_core::engine::{ActionOutcome, AnomalyEngine};
use eclss_logic::error::ActionError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// ============================================================================
// ROUTE TABLE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// GET /get_data
    GetData,
    /// GET /get_predictions
    GetPredictions,
    /// GET /get_recommendations
    GetRecommendations,
    /// POST /execute_action
    ExecuteAction,
}

impl Route {
    pub fn resolve(method: &str, path: &str) -> Option<Route> {
        let method = method.to_ascii_uppercase();
        match (method.as_str(), path.trim_end_matches('/')) {
            ("GET", "/get_data") => Some(Route::GetData),
            ("GET", "/get_predictions") => Some(Route::GetPredictions),
            ("GET", "/get_recommendations") => Some(Route::GetRecommendations),
            ("POST", "/execute_action") => Some(Route::ExecuteAction),
            _ => None,
        }
    }
}

// ============================================================================
// WIRE TYPES
// ============================================================================

/// Body of POST /execute_action. `action_id` is kept loose so a wrong type
/// can be told apart from a missing field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionRequest {
    #[serde(default)]
    pub action_id: Option<Value>,
}

impl ActionRequest {
    /// Integer ids, and floats with no fractional part (`1.0`).
    pub fn action_id(&self) -> Result<i64, ActionError> {
        let value = self.action_id.as_ref().ok_or(ActionError::MissingInput)?;
        value
            .as_i64()
            .or_else(|| {
                value
                    .as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                    .map(|f| f as i64)
            })
            .ok_or(ActionError::InvalidActionId)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Failure,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResponse {
    pub status: ResponseStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nasa_fact: Option<&'static str>,
}

impl ActionResponse {
    fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: message.into(),
            nasa_fact: None,
        }
    }
}

impl From<Result<ActionOutcome, ActionError>> for ActionResponse {
    fn from(result: Result<ActionOutcome, ActionError>) -> Self {
        match result {
            Ok(ActionOutcome::Resolved {
                message, nasa_fact, ..
            }) => Self {
                status: ResponseStatus::Success,
                message,
                nasa_fact: Some(nasa_fact),
            },
            Ok(ActionOutcome::Failed { message, .. }) => Self {
                status: ResponseStatus::Failure,
                message,
                nasa_fact: None,
            },
            Err(e) => Self::error(e.to_string()),
        }
    }
}

/// Status code plus JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status_code: u16,
    pub body: Value,
}

impl ApiResponse {
    fn ok(body: Value) -> Self {
        Self {
            status_code: 200,
            body,
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Value {
    match serde_json::to_value(value) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("Failed to serialize response: {}", e);
            json!({})
        }
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// Validate the action body. Missing, unparseable or non-integral input never
/// reaches the engine.
pub fn parse_action_request(body: Option<&str>) -> Result<i64, ActionError> {
    let body = body.ok_or(ActionError::MissingInput)?;
    let request: ActionRequest = serde_json::from_str(body).map_err(|e| {
        log::warn!("Rejected action body: {}", e);
        ActionError::MissingInput
    })?;
    request.action_id()
}

pub fn execute_action<C: Clock>(engine: &AnomalyEngine<C>, body: Option<&str>) -> ApiResponse {
    match parse_action_request(body) {
        Ok(action_id) => {
            let response = ActionResponse::from(engine.submit_action(action_id));
            ApiResponse::ok(to_json(&response))
        }
        Err(e) => {
            log::warn!("Action request rejected: {}", e);
            ApiResponse {
                status_code: 400,
                body: to_json(&ActionResponse::error(e.to_string())),
            }
        }
    }
}

pub fn handle<C: Clock>(
    engine: &AnomalyEngine<C>,
    route: Route,
    body: Option<&str>,
) -> ApiResponse {
    match route {
        Route::GetData => ApiResponse::ok(to_json(&engine.current_readings())),
        Route::GetPredictions => match engine.active_anomaly_info() {
            Some(view) => ApiResponse::ok(to_json(&view)),
            None => ApiResponse::ok(json!({})),
        },
        Route::GetRecommendations => ApiResponse::ok(to_json(&engine.recommendations())),
        Route::ExecuteAction => execute_action(engine, body),
    }
}

/// Resolve and handle a raw request.
pub fn dispatch<C: Clock>(
    engine: &AnomalyEngine<C>,
    method: &str,
    path: &str,
    body: Option<&str>,
) -> ApiResponse {
    match Route::resolve(method, path) {
        Some(route) => handle(engine, route, body),
        None => {
            log::debug!("No route for {} {}", method, path);
            ApiResponse {
                status_code: 404,
                body: to_json(&ActionResponse::error("Not found.")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eclss_core::clock::ManualClock;
    use eclss_core::config::EngineConfig;
    use eclss_logic::anomaly::AnomalyKind;

    fn engine() -> AnomalyEngine<ManualClock> {
        let config = EngineConfig {
            seed: Some(21),
            ..Default::default()
        };
        AnomalyEngine::with_clock(config, ManualClock::new())
    }

    #[test]
    fn test_route_table() {
        assert_eq!(Route::resolve("GET", "/get_data"), Some(Route::GetData));
        assert_eq!(
            Route::resolve("get", "/get_predictions/"),
            Some(Route::GetPredictions)
        );
        assert_eq!(
            Route::resolve("POST", "/execute_action"),
            Some(Route::ExecuteAction)
        );
        assert_eq!(Route::resolve("GET", "/execute_action"), None);
        assert_eq!(Route::resolve("DELETE", "/get_data"), None);
    }

    #[test]
    fn test_parse_action_request() {
        assert_eq!(parse_action_request(Some(r#"{"action_id": 2}"#)), Ok(2));
        assert_eq!(
            parse_action_request(Some("{}")),
            Err(ActionError::MissingInput)
        );
        assert_eq!(
            parse_action_request(Some(r#"{"action_id": null}"#)),
            Err(ActionError::MissingInput)
        );
        assert_eq!(
            parse_action_request(Some("not json")),
            Err(ActionError::MissingInput)
        );
        assert_eq!(parse_action_request(None), Err(ActionError::MissingInput));
    }

    #[test]
    fn test_action_id_types() {
        assert_eq!(parse_action_request(Some(r#"{"action_id": 1.0}"#)), Ok(1));
        assert_eq!(parse_action_request(Some(r#"{"action_id": -2.0}"#)), Ok(-2));
        for body in [
            r#"{"action_id": 1.5}"#,
            r#"{"action_id": "1"}"#,
            r#"{"action_id": true}"#,
            r#"{"action_id": [1]}"#,
            r#"{"action_id": 1e30}"#,
        ] {
            assert_eq!(
                parse_action_request(Some(body)),
                Err(ActionError::InvalidActionId),
                "{}",
                body
            );
        }
    }

    #[test]
    fn test_integral_float_resolves() {
        let engine = engine();
        dispatch(&engine, "GET", "/get_data", None);
        let response = dispatch(&engine, "POST", "/execute_action", Some(r#"{"action_id": 1.0}"#));
        assert_eq!(response.status_code, 200);
        assert_eq!(response.body["status"], "success");
    }

    #[test]
    fn test_string_action_id_is_not_missing() {
        let engine = engine();
        let before = engine.snapshot();
        let response = dispatch(&engine, "POST", "/execute_action", Some(r#"{"action_id": "1"}"#));
        assert_eq!(response.status_code, 400);
        assert_eq!(response.body["message"], "action_id must be an integer.");
        assert_eq!(engine.snapshot(), before);
    }

    #[test]
    fn test_get_data_shape() {
        let engine = engine();
        let response = dispatch(&engine, "GET", "/get_data", None);
        assert_eq!(response.status_code, 200);
        let co2 = &response.body["CO₂ Concentration (%)"];
        assert_eq!(co2["status"], "CAUTION");
        assert_eq!(co2["unit"], "%");
        assert!(co2["value"].is_f64());
    }

    #[test]
    fn test_missing_action_id_is_client_error() {
        let engine = engine();
        let before = engine.snapshot();
        let response = dispatch(&engine, "POST", "/execute_action", Some("{}"));
        assert_eq!(response.status_code, 400);
        assert_eq!(response.body["status"], "error");
        assert_eq!(response.body["message"], "No action_id provided.");
        assert_eq!(engine.snapshot(), before);
    }

    #[test]
    fn test_success_and_empty_predictions() {
        let engine = engine();
        dispatch(&engine, "GET", "/get_data", None);
        let response = dispatch(&engine, "POST", "/execute_action", Some(r#"{"action_id": 1}"#));
        assert_eq!(response.status_code, 200);
        assert_eq!(response.body["status"], "success");
        assert!(response.body["nasa_fact"].is_string());

        let predictions = dispatch(&engine, "GET", "/get_predictions", None);
        assert_eq!(predictions.body, json!({}));
        let recs = dispatch(&engine, "GET", "/get_recommendations", None);
        assert_eq!(recs.body, json!([]));
    }

    #[test]
    fn test_failure_has_no_fact() {
        let engine = engine();
        let response = dispatch(&engine, "POST", "/execute_action", Some(r#"{"action_id": 2}"#));
        assert_eq!(response.body["status"], "failure");
        assert!(response.body.get("nasa_fact").is_none());
        assert_eq!(engine.active_anomaly(), Some(AnomalyKind::Co2));
    }

    #[test]
    fn test_engine_errors_are_200() {
        let engine = engine();
        let unknown = dispatch(&engine, "POST", "/execute_action", Some(r#"{"action_id": 9}"#));
        assert_eq!(unknown.status_code, 200);
        assert_eq!(unknown.body["message"], "Unknown action ID.");

        dispatch(&engine, "POST", "/execute_action", Some(r#"{"action_id": 1}"#));
        let quiet = dispatch(&engine, "POST", "/execute_action", Some(r#"{"action_id": 1}"#));
        assert_eq!(quiet.body["status"], "error");
        assert_eq!(
            quiet.body["message"],
            "No active anomaly to execute an action against."
        );
    }

    #[test]
    fn test_unknown_route() {
        let engine = engine();
        let response = dispatch(&engine, "GET", "/", None);
        assert_eq!(response.status_code, 404);
    }
}
