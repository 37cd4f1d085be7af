//! Plan mode event payloads.

use serde::{Deserialize, Serialize};

/// Payload for `plan.mode_entered` events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanModeEnteredPayload {
    /// Skill that drives the planning phase.
    pub skill_name: String,
    /// Tools blocked while planning.
    #[serde(default)]
    pub blocked_tools: Vec<String>,
}

/// Payload for `plan.mode_exited` events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanModeExitedPayload {
    /// Why plan mode ended.
    pub reason: String,
    /// Plan file written during the phase, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entered_defaults_blocked_tools() {
        let p: PlanModeEnteredPayload =
            serde_json::from_value(json!({"skillName": "design"})).unwrap();
        assert!(p.blocked_tools.is_empty());
    }

    #[test]
    fn exited_omits_absent_plan_path() {
        let p = PlanModeExitedPayload {
            reason: "approved".into(),
            plan_path: None,
        };
        assert!(!serde_json::to_string(&p).unwrap().contains("planPath"));
    }
}
