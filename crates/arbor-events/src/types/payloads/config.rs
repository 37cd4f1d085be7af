//! Config event payloads.

use serde::{Deserialize, Serialize};

/// Payload for `config.model_switch` events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigModelSwitchPayload {
    /// Model the session was using.
    pub from_model: String,
    /// Model the session switched to.
    pub to_model: String,
}
