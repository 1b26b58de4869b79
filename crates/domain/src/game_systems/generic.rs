//! Ruleset-agnostic hook set.
//!
//! Uses every default: 1d10, explode on 10, success on 7+, raw successes.

use super::traits::RollHooks;

#[derive(Debug, Clone, Copy, Default)]
pub struct GenericRuleset;

impl RollHooks for GenericRuleset {
    type SystemData = ();

    fn slug(&self) -> &str {
        "generic"
    }

    fn display_name(&self) -> &str {
        "Generic d10"
    }
}
