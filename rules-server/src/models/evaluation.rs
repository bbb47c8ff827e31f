//! Evaluation request model
//!
//! The boundary is strict so the permissive core never sees garbage:
//! shape first on raw JSON (clear messages for missing/oversized
//! collections), then the typed payload, then `validator` port checks.

use rules_core::constants::{MAX_RULES, MAX_TARGETS};
use rules_core::engine::{Engagement, Rule, Target};
use serde::Deserialize;
use serde_json::Value;
use validator::{Validate, ValidationError};

use crate::AppError;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateRequest {
    pub rules: Vec<Rule>,

    pub engagement: Engagement,

    #[validate(custom(function = "validate_target_ports"))]
    pub targets: Vec<Target>,

    #[serde(default)]
    pub selected_target: Option<Target>,
}

impl EvaluateRequest {
    /// Parse and validate a raw request body
    pub fn from_body(bytes: &[u8]) -> Result<Self, AppError> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|_| AppError::ValidationError("Invalid JSON body".to_string()))?;

        check_shape(&value)?;

        let request: Self = serde_json::from_value(value).map_err(|e| {
            tracing::debug!("Rejected evaluation payload: {}", e);
            AppError::ValidationError("Invalid request payload".to_string())
        })?;

        request
            .validate()
            .map_err(|e| AppError::ValidationError(format!("Invalid request payload: {}", e)))?;

        if let Some(selected) = &request.selected_target {
            validate_target_ports(std::slice::from_ref(selected))
                .map_err(|_| AppError::ValidationError("Invalid request payload: selectedTarget".to_string()))?;
        }

        Ok(request)
    }
}

/// Presence, type and size of the top-level collections
fn check_shape(value: &Value) -> Result<(), AppError> {
    let rules = value
        .get("rules")
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::ValidationError("Missing or invalid 'rules' parameter".to_string()))?;

    if !value.get("engagement").is_some_and(Value::is_object) {
        return Err(AppError::ValidationError(
            "Missing or invalid 'engagement' parameter".to_string(),
        ));
    }

    let targets = value
        .get("targets")
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::ValidationError("Missing or invalid 'targets' parameter".to_string()))?;

    if rules.len() > MAX_RULES {
        return Err(AppError::ValidationError(format!(
            "Too many rules. Maximum {} allowed.",
            MAX_RULES
        )));
    }

    if targets.len() > MAX_TARGETS {
        return Err(AppError::ValidationError(format!(
            "Too many targets. Maximum {} allowed.",
            MAX_TARGETS
        )));
    }

    Ok(())
}

/// Port numbers are 1-65535; `u16` already caps the top
fn validate_target_ports(targets: &[Target]) -> Result<(), ValidationError> {
    if targets.iter().flat_map(|t| t.ports.iter()).any(|p| p.port == 0) {
        return Err(ValidationError::new("port_out_of_range"));
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    fn engagement() -> Value {
        json!({ "id": "e1", "name": "ACME", "phase": "enumeration", "status": "active" })
    }

    fn message(result: Result<EvaluateRequest, AppError>) -> String {
        match result {
            Err(AppError::ValidationError(msg)) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_request() {
        let request = EvaluateRequest::from_body(&body(json!({
            "rules": [],
            "engagement": engagement(),
            "targets": [{
                "id": "t1", "ip": "10.0.0.5", "inScope": true, "discoveredDuringRecon": true,
                "ports": [{ "port": 22, "service": "ssh", "version": "OpenSSH 8.2p1", "status": "open" }]
            }],
            "selectedTarget": null
        })))
        .unwrap();

        assert_eq!(request.targets[0].ports[0].port, 22);
        assert!(request.selected_target.is_none());
    }

    #[test]
    fn test_missing_collections() {
        assert_eq!(
            message(EvaluateRequest::from_body(&body(json!({ "engagement": engagement(), "targets": [] })))),
            "Missing or invalid 'rules' parameter"
        );
        assert_eq!(
            message(EvaluateRequest::from_body(&body(json!({ "rules": [], "engagement": "x", "targets": [] })))),
            "Missing or invalid 'engagement' parameter"
        );
        assert_eq!(
            message(EvaluateRequest::from_body(&body(json!({ "rules": [], "engagement": engagement(), "targets": {} })))),
            "Missing or invalid 'targets' parameter"
        );
    }

    #[test]
    fn test_too_many_rules() {
        let rules: Vec<Value> = (0..=MAX_RULES).map(|i| json!({ "id": i.to_string(), "name": "r" })).collect();
        assert_eq!(
            message(EvaluateRequest::from_body(&body(json!({
                "rules": rules, "engagement": engagement(), "targets": []
            })))),
            "Too many rules. Maximum 1000 allowed."
        );
    }

    #[test]
    fn test_too_many_targets() {
        let targets: Vec<Value> = (0..=MAX_TARGETS).map(|i| json!({ "id": i.to_string(), "ip": "10.0.0.1" })).collect();
        assert_eq!(
            message(EvaluateRequest::from_body(&body(json!({
                "rules": [], "engagement": engagement(), "targets": targets
            })))),
            "Too many targets. Maximum 1000 allowed."
        );
    }

    #[test]
    fn test_null_draft_rule_does_not_sink_request() {
        let request = EvaluateRequest::from_body(&body(json!({
            "rules": [
                {
                    "id": "r-ssh", "name": "SSH", "phase": "enumeration", "enabled": true,
                    "conditions": [{ "type": "service_detected", "field": "service", "operator": "equals", "value": "ssh" }],
                    "suggestions": [{ "title": "Audit SSH config", "description": "", "confidence": "high" }]
                },
                { "id": "r-draft", "name": "draft", "phase": null, "enabled": null }
            ],
            "engagement": engagement(),
            "targets": [{
                "id": "t1", "ip": "10.0.0.5",
                "ports": [{ "port": 22, "service": "ssh", "status": "open" }]
            }]
        })))
        .unwrap();

        let suggestions = rules_core::evaluate_all(
            &request.rules,
            &request.engagement,
            &request.targets,
            request.selected_target.as_ref(),
        );
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].rule_id, "r-ssh");
    }

    #[test]
    fn test_unknown_operator_rejected() {
        let result = EvaluateRequest::from_body(&body(json!({
            "rules": [{
                "id": "r1", "name": "bad", "phase": "enumeration", "enabled": true,
                "conditions": [{ "type": "service_detected", "field": "", "operator": "startswith", "value": "ssh" }]
            }],
            "engagement": engagement(),
            "targets": []
        })));
        assert_eq!(message(result), "Invalid request payload");
    }

    #[test]
    fn test_port_zero_rejected() {
        let result = EvaluateRequest::from_body(&body(json!({
            "rules": [],
            "engagement": engagement(),
            "targets": [{ "id": "t1", "ip": "10.0.0.5", "ports": [{ "port": 0, "status": "open" }] }]
        })));
        assert!(message(result).starts_with("Invalid request payload"));
    }

    #[test]
    fn test_not_json() {
        assert_eq!(message(EvaluateRequest::from_body(b"rules=1")), "Invalid JSON body");
    }
}
