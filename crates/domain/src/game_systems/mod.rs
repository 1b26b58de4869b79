//! Rulesets and the registry that selects them.
//!
//! A ruleset implements [`RollHooks`] with its own `SystemData`. The registry
//! stores rulesets behind the object-safe [`Ruleset`] trait, which works on
//! ruleset-agnostic contexts and carries system data as JSON.
//!
//! # Built-in rulesets
//!
//! - Saga (`saga`)
//! - Generic d10 (`generic`)

mod generic;
mod saga;
mod traits;

use std::sync::Arc;

pub use generic::GenericRuleset;
pub use saga::{
    SagaData, SagaRuleset, ESCALATION_COST, ESCALATION_GATE, INSURANCE_COST, SAGA_POOL_COLOR,
};
pub use traits::{RollHooks, DEFAULT_GROUP_COLOR, DEFAULT_GROUP_ID};

use crate::error::RollError;
use crate::resolution::{self, RolledCheck};
use crate::roll::{DeclaredMode, RollContext, RollResult};

/// A resolved check with its system data erased to JSON.
pub type RollReport = RolledCheck<serde_json::Value>;

/// Die source handed through the registry: `(min, max) -> face`, inclusive.
pub type DieRoller<'a> = dyn FnMut(u32, u32) -> u32 + 'a;

/// Object-safe view of a ruleset.
pub trait Ruleset: Send + Sync {
    fn slug(&self) -> &str;

    fn display_name(&self) -> &str;

    /// See [`RollHooks::upfront_cost`].
    fn upfront_cost(&self, mode: DeclaredMode) -> u32;

    fn roll(&self, ctx: RollContext, roll_die: &mut DieRoller<'_>) -> Result<RollReport, RollError>;

    fn roll_with_insurance(
        &self,
        ctx: RollContext,
        roll_die: &mut DieRoller<'_>,
    ) -> Result<RollReport, RollError>;

    /// Continue an escalated roll. `ctx` is the enriched context of the base
    /// report.
    fn roll_saga_bonus(
        &self,
        base: &RollResult,
        ctx: &RollContext<serde_json::Value>,
        final_target: u32,
        roll_die: &mut DieRoller<'_>,
    ) -> Result<RollReport, RollError>;

    /// Pick the roll shape for the declared mode.
    fn roll_for_mode(
        &self,
        ctx: RollContext,
        roll_die: &mut DieRoller<'_>,
    ) -> Result<RollReport, RollError> {
        match ctx.declared_mode {
            DeclaredMode::Insurance => self.roll_with_insurance(ctx, roll_die),
            _ => self.roll(ctx, roll_die),
        }
    }
}

/// Adapts a [`RollHooks`] implementation to [`Ruleset`].
pub struct HookedRuleset<H> {
    hooks: H,
}

impl<H: RollHooks> HookedRuleset<H> {
    pub fn new(hooks: H) -> Self {
        Self { hooks }
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }
}

impl<H: RollHooks> Ruleset for HookedRuleset<H> {
    fn slug(&self) -> &str {
        self.hooks.slug()
    }

    fn display_name(&self) -> &str {
        self.hooks.display_name()
    }

    fn upfront_cost(&self, mode: DeclaredMode) -> u32 {
        self.hooks.upfront_cost(mode)
    }

    fn roll(&self, ctx: RollContext, roll_die: &mut DieRoller<'_>) -> Result<RollReport, RollError> {
        let ctx = ctx.with_system_data(H::SystemData::default());
        resolution::roll(ctx, &self.hooks, roll_die)?.into_report()
    }

    fn roll_with_insurance(
        &self,
        ctx: RollContext,
        roll_die: &mut DieRoller<'_>,
    ) -> Result<RollReport, RollError> {
        let ctx = ctx.with_system_data(H::SystemData::default());
        resolution::roll_with_insurance(ctx, &self.hooks, roll_die)?.into_report()
    }

    fn roll_saga_bonus(
        &self,
        base: &RollResult,
        ctx: &RollContext<serde_json::Value>,
        final_target: u32,
        roll_die: &mut DieRoller<'_>,
    ) -> Result<RollReport, RollError> {
        let data: H::SystemData = serde_json::from_value(ctx.system_data.clone())
            .map_err(|e| RollError::InvalidSystemData(e.to_string()))?;
        let ctx = ctx.clone().with_system_data(data);
        resolution::roll_saga_bonus(base, &ctx, &self.hooks, final_target, roll_die)?
            .into_report()
    }
}

/// Registry of available rulesets.
pub struct RulesetRegistry {
    rulesets: Vec<Arc<dyn Ruleset>>,
}

impl Default for RulesetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RulesetRegistry {
    /// Create a registry with the built-in rulesets.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register_hooks(SagaRuleset::new());
        registry.register_hooks(GenericRuleset);
        registry
    }

    /// Create an empty registry without built-in rulesets.
    pub fn empty() -> Self {
        Self {
            rulesets: Vec::new(),
        }
    }

    /// Register a ruleset, replacing any ruleset with the same slug.
    pub fn register(&mut self, ruleset: Arc<dyn Ruleset>) {
        self.rulesets.retain(|r| r.slug() != ruleset.slug());
        self.rulesets.push(ruleset);
    }

    pub fn register_hooks<H: RollHooks + 'static>(&mut self, hooks: H) {
        self.register(Arc::new(HookedRuleset::new(hooks)));
    }

    /// Get a ruleset by its slug.
    pub fn get(&self, slug: &str) -> Option<Arc<dyn Ruleset>> {
        self.rulesets.iter().find(|r| r.slug() == slug).cloned()
    }

    /// List all registered slugs.
    pub fn list_rulesets(&self) -> Vec<&str> {
        self.rulesets.iter().map(|r| r.slug()).collect()
    }

    /// List all registered rulesets with their display names.
    pub fn list_rulesets_with_names(&self) -> Vec<(&str, &str)> {
        self.rulesets
            .iter()
            .map(|r| (r.slug(), r.display_name()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{CharacterId, SessionId};
    use crate::roll::CharacterSnapshot;

    fn scripted(faces: Vec<u32>) -> impl FnMut(u32, u32) -> u32 {
        let mut iter = faces.into_iter();
        move |min, _max| iter.next().unwrap_or(min)
    }

    fn saga_ctx() -> RollContext {
        RollContext::new(CharacterId::new(), "Gunnar", SessionId::new(), "saga")
            .with_label("Might + Sword")
            .with_character(CharacterSnapshot {
                ability: 2,
                skill: 1,
                ability_tier: 1,
                saga_points: 1,
                ..Default::default()
            })
    }

    #[test]
    fn test_registry_includes_builtins() {
        let registry = RulesetRegistry::new();
        let slugs = registry.list_rulesets();
        assert!(slugs.contains(&"saga"));
        assert!(slugs.contains(&"generic"));
        assert_eq!(slugs.len(), 2);
    }

    #[test]
    fn test_empty_registry_has_no_rulesets() {
        assert!(RulesetRegistry::empty().list_rulesets().is_empty());
    }

    #[test]
    fn test_registry_list_with_names() {
        let registry = RulesetRegistry::new();
        let names = registry.list_rulesets_with_names();
        assert!(names.iter().any(|(slug, name)| *slug == "saga" && *name == "Saga"));
    }

    #[test]
    fn test_register_replaces_same_slug() {
        let mut registry = RulesetRegistry::new();
        registry.register_hooks(SagaRuleset::new());
        assert_eq!(registry.list_rulesets().len(), 2);
    }

    #[test]
    fn test_erased_roll_matches_hooks() {
        let registry = RulesetRegistry::new();
        let saga = registry.get("saga").expect("saga should be registered");
        let mut dice = scripted(vec![7, 10, 2, 8]);

        let report = saga.roll(saga_ctx(), &mut dice).unwrap();
        assert_eq!(report.notation, "3d10!>=10>=7");
        assert_eq!(report.result.all_dice, vec![7, 10, 2, 8]);
        assert_eq!(report.result.successes, 3);
        assert_eq!(report.context.system_data["threshold"], 7);
    }

    #[test]
    fn test_roll_for_mode_dispatches_insurance() {
        let saga = RulesetRegistry::new().get("saga").expect("saga should be registered");
        let mut dice = scripted(vec![2, 2, 2, 7, 8, 2]);

        let report = saga
            .roll_for_mode(saga_ctx().with_mode(DeclaredMode::Insurance), &mut dice)
            .unwrap();
        assert_eq!(report.result.meta.kept_roll, Some(2));
        assert_eq!(report.result.meta.resource_spent, 1);
        assert_eq!(report.animation.mode(), "insurance");
        assert_eq!(saga.upfront_cost(DeclaredMode::Insurance), 1);
    }

    #[test]
    fn test_erased_bonus_uses_stored_system_data() {
        let saga = RulesetRegistry::new().get("saga").expect("saga should be registered");
        let mut dice = scripted(vec![7, 8, 9, 7, 2]);

        let base = saga
            .roll(saga_ctx().with_mode(DeclaredMode::EscalatingTierA), &mut dice)
            .unwrap();
        let gate = base.result.escalation.expect("three successes open the gate");

        let bonus = saga
            .roll_saga_bonus(&base.result, &base.context, gate.final_target, &mut dice)
            .unwrap();
        assert_eq!(bonus.params.pool, 2);
        assert_eq!(bonus.result.successes, 4);
        assert_eq!(bonus.result.meta.saga_success, Some(true));
        assert_eq!(bonus.result.escalation, None);
    }

    #[test]
    fn test_erased_bonus_rejects_foreign_system_data() {
        let saga = RulesetRegistry::new().get("saga").expect("saga should be registered");
        let base = saga.roll(saga_ctx(), &mut scripted(vec![7, 8, 9])).unwrap();
        let ctx = base.context.clone().with_system_data(serde_json::json!("nope"));

        let err = saga
            .roll_saga_bonus(&base.result, &ctx, 4, &mut scripted(vec![7, 7]))
            .unwrap_err();
        assert_eq!(err.code(), "invalid_system_data");
    }

    #[test]
    fn test_generic_ruleset_uses_defaults() {
        let generic = RulesetRegistry::new().get("generic").expect("generic should be registered");
        let ctx = RollContext::new(CharacterId::new(), "Gunnar", SessionId::new(), "generic");

        let report = generic.roll(ctx, &mut scripted(vec![10, 10, 3])).unwrap();
        assert_eq!(report.notation, "1d10!>=10>=7");
        assert_eq!(report.raw.waves.len(), 3);
        assert!(report.result.flags.critical);
        assert_eq!(report.result.successes, 2);
    }
}
