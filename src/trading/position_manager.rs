//! Post-entry management: HOLD/ADD/EXIT once a position is open.

use std::sync::Arc;

use crate::models::{Action, FeatureVector, Intent};
use crate::signal::ActionPolicy;

use super::decision::PolicyWindow;

/// Management intents for an open position.
///
/// Disabled, it always holds and leaves exits to the engine's fixed rules.
/// Enabled, it asks an external policy (0=EXIT, 1=HOLD, 2=ADD) after the
/// same cold-start period as the policy-driven entry decision.
pub struct PositionManager {
    window: Option<PolicyWindow>,
}

impl PositionManager {
    pub fn disabled() -> Self {
        Self { window: None }
    }

    pub fn with_policy(policy: Arc<dyn ActionPolicy>) -> Self {
        Self {
            window: Some(PolicyWindow::new(policy)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.window.is_some()
    }

    pub fn decide(&mut self, features: &FeatureVector) -> Intent {
        let Some(window) = self.window.as_mut() else {
            return Intent::hold();
        };
        match window.observe(features) {
            Some(index) => Intent::new(Action::from_management_index(index), None),
            None => Intent::hold(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trading::decision::tests::ScriptedPolicy;

    #[test]
    fn test_disabled_always_holds() {
        let mut pm = PositionManager::disabled();
        assert!(!pm.is_enabled());
        for _ in 0..5 {
            assert_eq!(pm.decide(&FeatureVector::default()), Intent::hold());
        }
    }

    #[test]
    fn test_maps_actions_after_warmup() {
        let policy = Arc::new(ScriptedPolicy::new(2, vec![2, 0, 1, 9]));
        let mut pm = PositionManager::with_policy(policy);
        let fv = FeatureVector::default();

        assert_eq!(pm.decide(&fv), Intent::hold());
        assert_eq!(pm.decide(&fv).action, Action::Add);
        assert_eq!(pm.decide(&fv).action, Action::Exit);
        assert_eq!(pm.decide(&fv).action, Action::Hold);
        // Out of range
        assert_eq!(pm.decide(&fv).action, Action::Hold);
    }
}
