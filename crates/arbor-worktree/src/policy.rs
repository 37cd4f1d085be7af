//! Isolation policy.
//!
//! Decides whether a session runs in the repository's main checkout or in an
//! isolated sibling checkout. `never` wins over every other signal.

use crate::types::IsolationMode;

/// Inputs to the isolation decision.
#[derive(Clone, Copy, Debug, Default)]
pub struct IsolationInputs {
    /// Caller explicitly requested isolation.
    pub force_isolation: bool,
    /// The session is a fork of another session.
    pub has_parent_session: bool,
    /// The main directory is already owned by another active session.
    pub main_directory_owned: bool,
}

/// Whether to isolate, given the configured mode and the current inputs.
#[must_use]
pub fn should_isolate(mode: IsolationMode, inputs: IsolationInputs) -> bool {
    match mode {
        IsolationMode::Never => false,
        IsolationMode::Always => true,
        IsolationMode::Lazy => {
            inputs.force_isolation || inputs.has_parent_session || inputs.main_directory_owned
        }
    }
}
