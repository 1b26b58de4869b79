//! Per-action roll context.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::{CharacterId, SessionId};

/// Meta-mechanic the player chose before rolling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeclaredMode {
    #[default]
    None,
    /// Roll twice, keep the better
    Insurance,
    /// Offer a bonus roll toward the lower escalation target
    EscalatingTierA,
    /// Offer a bonus roll toward the higher escalation target
    EscalatingTierB,
}

impl DeclaredMode {
    pub fn is_escalating(&self) -> bool {
        matches!(
            self,
            DeclaredMode::EscalatingTierA | DeclaredMode::EscalatingTierB
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeclaredMode::None => "none",
            DeclaredMode::Insurance => "insurance",
            DeclaredMode::EscalatingTierA => "escalating-tier-a",
            DeclaredMode::EscalatingTierB => "escalating-tier-b",
        }
    }
}

impl fmt::Display for DeclaredMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only view of the acting character at the moment of the roll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CharacterSnapshot {
    pub ability: u32,
    pub skill: u32,
    pub ability_tier: u8,
    pub wounds: u32,
    pub max_wounds: u32,
    pub fatigue: u32,
    /// Spendable resource used by insurance and escalation
    pub saga_points: u32,
    pub incapacitated: bool,
    pub trait_bonus: u32,
    /// Successes granted without rolling
    pub auto_successes: u32,
}

impl CharacterSnapshot {
    /// Explicitly flagged, or wounded down to the track's last box.
    pub fn is_incapacitated(&self) -> bool {
        self.incapacitated || (self.max_wounds > 0 && self.wounds >= self.max_wounds)
    }
}

/// Everything a ruleset needs to resolve one roll.
///
/// `D` is the ruleset's own enrichment type. Callers build a `RollContext<()>`
/// and the ruleset rebinds it with [`RollContext::with_system_data`]; hooks
/// return enriched copies instead of mutating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollContext<D = ()> {
    pub character_id: CharacterId,
    pub character_name: String,
    pub session_id: SessionId,
    /// Ruleset identifier used for registry lookup
    pub system_slug: String,
    /// Display label, e.g. "Strength + Athletics"
    pub label: String,
    /// Free-form tag, e.g. "attack", "skill"
    pub roll_type: String,
    pub declared_mode: DeclaredMode,
    /// Successes (or total) needed, when the check has a difficulty
    pub roll_target: Option<u32>,
    pub character: CharacterSnapshot,
    pub system_data: D,
}

impl RollContext {
    pub fn new(
        character_id: CharacterId,
        character_name: impl Into<String>,
        session_id: SessionId,
        system_slug: impl Into<String>,
    ) -> Self {
        Self {
            character_id,
            character_name: character_name.into(),
            session_id,
            system_slug: system_slug.into(),
            label: String::new(),
            roll_type: "check".to_string(),
            declared_mode: DeclaredMode::None,
            roll_target: None,
            character: CharacterSnapshot::default(),
            system_data: (),
        }
    }
}

impl<D> RollContext<D> {
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_roll_type(mut self, roll_type: impl Into<String>) -> Self {
        self.roll_type = roll_type.into();
        self
    }

    pub fn with_mode(mut self, mode: DeclaredMode) -> Self {
        self.declared_mode = mode;
        self
    }

    pub fn with_target(mut self, target: u32) -> Self {
        self.roll_target = Some(target);
        self
    }

    pub fn with_character(mut self, character: CharacterSnapshot) -> Self {
        self.character = character;
        self
    }

    /// Rebind the context with ruleset data, keeping every other field.
    pub fn with_system_data<E>(self, system_data: E) -> RollContext<E> {
        RollContext {
            character_id: self.character_id,
            character_name: self.character_name,
            session_id: self.session_id,
            system_slug: self.system_slug,
            label: self.label,
            roll_type: self.roll_type,
            declared_mode: self.declared_mode,
            roll_target: self.roll_target,
            character: self.character,
            system_data,
        }
    }

    /// Drop ruleset data, e.g. before handing the context back to a caller.
    pub fn without_system_data(self) -> RollContext {
        self.with_system_data(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_rebind() {
        let ctx = RollContext::new(CharacterId::new(), "Brynja", SessionId::new(), "saga")
            .with_label("Might + Axes")
            .with_mode(DeclaredMode::Insurance)
            .with_target(2);

        let enriched = ctx.clone().with_system_data(42u32);
        assert_eq!(enriched.system_data, 42);
        assert_eq!(enriched.label, "Might + Axes");
        assert_eq!(enriched.declared_mode, DeclaredMode::Insurance);
        assert_eq!(enriched.without_system_data(), ctx);
    }

    #[test]
    fn test_incapacitation() {
        let mut snapshot = CharacterSnapshot {
            wounds: 2,
            max_wounds: 5,
            ..Default::default()
        };
        assert!(!snapshot.is_incapacitated());
        snapshot.wounds = 5;
        assert!(snapshot.is_incapacitated());
        snapshot.wounds = 0;
        snapshot.incapacitated = true;
        assert!(snapshot.is_incapacitated());
    }

    #[test]
    fn test_mode_wire_names() {
        assert_eq!(
            serde_json::to_value(DeclaredMode::EscalatingTierA).unwrap(),
            "escalating-tier-a"
        );
        let mode: DeclaredMode = serde_json::from_str("\"insurance\"").unwrap();
        assert_eq!(mode, DeclaredMode::Insurance);
        assert!(DeclaredMode::EscalatingTierB.is_escalating());
        assert!(!DeclaredMode::Insurance.is_escalating());
    }
}
