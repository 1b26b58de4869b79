//! Per-action roll state machine.
//!
//! ```text
//! Idle -> Rolling -> Resolved
//!                 \-> AwaitingDecision -> RollingBonus -> Final
//!                                      \-> Declined
//! ```
//!
//! `AwaitingDecision` is only reachable when an escalating mode was declared
//! and the ruleset offered an [`EscalationGate`]. The flow never touches a
//! resource itself; it reports the [`ResourceAdjustment`] the caller applies
//! once a shape concludes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{DeclaredMode, EscalationGate, RollResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RollPhase {
    Idle,
    Rolling,
    Resolved,
    AwaitingDecision,
    RollingBonus,
    Final,
    Declined,
}

impl RollPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RollPhase::Resolved | RollPhase::Final | RollPhase::Declined
        )
    }
}

/// Change the caller applies to its spendable resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceAdjustment {
    None,
    Spend(u32),
    Gain(u32),
}

impl ResourceAdjustment {
    /// Adjustment recorded in a concluded result's meta.
    pub fn from_result(result: &RollResult) -> Self {
        match result.resource_delta() {
            0 => ResourceAdjustment::None,
            delta if delta < 0 => ResourceAdjustment::Spend(delta.unsigned_abs() as u32),
            delta => ResourceAdjustment::Gain(delta as u32),
        }
    }

    pub fn delta(&self) -> i64 {
        match self {
            ResourceAdjustment::None => 0,
            ResourceAdjustment::Spend(n) => -i64::from(*n),
            ResourceAdjustment::Gain(n) => i64::from(*n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EscalationError {
    #[error("Cannot {action} while {from:?}")]
    InvalidTransition { from: RollPhase, action: &'static str },
}

/// Tracks one roll action through its phases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationFlow {
    phase: RollPhase,
    mode: DeclaredMode,
    gate: Option<EscalationGate>,
}

impl EscalationFlow {
    pub fn new(mode: DeclaredMode) -> Self {
        Self {
            phase: RollPhase::Idle,
            mode,
            gate: None,
        }
    }

    pub fn phase(&self) -> RollPhase {
        self.phase
    }

    pub fn mode(&self) -> DeclaredMode {
        self.mode
    }

    pub fn gate(&self) -> Option<EscalationGate> {
        self.gate
    }

    fn transition(
        &mut self,
        expected: RollPhase,
        next: RollPhase,
        action: &'static str,
    ) -> Result<(), EscalationError> {
        if self.phase != expected {
            return Err(EscalationError::InvalidTransition {
                from: self.phase,
                action,
            });
        }
        self.phase = next;
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), EscalationError> {
        self.transition(RollPhase::Idle, RollPhase::Rolling, "start rolling")
    }

    /// Record the base roll. Returns the adjustment the base shape carries
    /// (the upfront insurance spend, for instance).
    pub fn resolve(&mut self, result: &RollResult) -> Result<ResourceAdjustment, EscalationError> {
        let next = match result.escalation {
            Some(_) if self.mode.is_escalating() => RollPhase::AwaitingDecision,
            _ => RollPhase::Resolved,
        };
        self.transition(RollPhase::Rolling, next, "resolve")?;
        if next == RollPhase::AwaitingDecision {
            self.gate = result.escalation;
        }
        Ok(ResourceAdjustment::from_result(result))
    }

    /// Player accepts the stake. Returns the gate to roll against.
    pub fn confirm(&mut self) -> Result<EscalationGate, EscalationError> {
        let gate = self.gate.ok_or(EscalationError::InvalidTransition {
            from: self.phase,
            action: "confirm escalation",
        })?;
        self.transition(
            RollPhase::AwaitingDecision,
            RollPhase::RollingBonus,
            "confirm escalation",
        )?;
        Ok(gate)
    }

    /// Player walks away; nothing is staked.
    pub fn decline(&mut self) -> Result<ResourceAdjustment, EscalationError> {
        self.transition(
            RollPhase::AwaitingDecision,
            RollPhase::Declined,
            "decline escalation",
        )?;
        Ok(ResourceAdjustment::None)
    }

    /// Record the bonus phase. The stake is lost only on failure.
    pub fn finish_bonus(
        &mut self,
        bonus: &RollResult,
    ) -> Result<ResourceAdjustment, EscalationError> {
        self.transition(RollPhase::RollingBonus, RollPhase::Final, "finish bonus roll")?;
        let cost = self.gate.map(|g| g.resource_cost).unwrap_or(0);
        match bonus.meta.saga_success {
            Some(true) => Ok(ResourceAdjustment::None),
            _ if cost == 0 => Ok(ResourceAdjustment::None),
            _ => Ok(ResourceAdjustment::Spend(cost)),
        }
    }
}
