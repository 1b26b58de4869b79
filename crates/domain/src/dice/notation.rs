//! Roll notation for logging and audit.
//!
//! Format: `<pool><diceType>!>=<explodeMin>>=<threshold>`, e.g. `3d10!>=9>=7`
//! is three ten-sided dice, any die of 9 or more explodes, any die of 7 or more
//! succeeds. `explodeMin` is the floor of the explosion set.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{explosion_floor, DiceType, RollParams};

/// Error when parsing roll notation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotationError {
    /// The notation string is empty
    #[error("Empty roll notation")]
    Empty,
    /// Invalid format - expected `XdY!>=E>=T`
    #[error("Invalid roll notation: {0}")]
    InvalidFormat(String),
    /// Die kind not supported
    #[error("Unknown dice type: {0}")]
    UnknownDiceType(String),
}

/// Parsed or built roll notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollNotation {
    pub pool: u32,
    pub dice_type: DiceType,
    pub explode_min: u32,
    pub threshold: u32,
}

impl RollNotation {
    /// Parse notation like "3d10!>=9>=7".
    pub fn parse(input: &str) -> Result<Self, NotationError> {
        let input = input.trim().to_lowercase();
        if input.is_empty() {
            return Err(NotationError::Empty);
        }

        let d_pos = input.find('d').ok_or_else(|| {
            NotationError::InvalidFormat(format!("Missing 'd' separator in '{}'", input))
        })?;
        let pool_str = &input[..d_pos];
        let pool: u32 = pool_str.parse().map_err(|_| {
            NotationError::InvalidFormat(format!("Invalid pool: '{}'", pool_str))
        })?;

        let after_d = &input[d_pos..];
        let (dice_str, rest) = after_d.split_once("!>=").ok_or_else(|| {
            NotationError::InvalidFormat(format!("Missing explosion clause in '{}'", input))
        })?;
        let dice_type: DiceType = dice_str.parse()?;

        let (explode_str, threshold_str) = rest.split_once(">=").ok_or_else(|| {
            NotationError::InvalidFormat(format!("Missing success clause in '{}'", input))
        })?;
        let explode_min: u32 = explode_str.parse().map_err(|_| {
            NotationError::InvalidFormat(format!("Invalid explosion floor: '{}'", explode_str))
        })?;
        let threshold: u32 = threshold_str.parse().map_err(|_| {
            NotationError::InvalidFormat(format!("Invalid threshold: '{}'", threshold_str))
        })?;

        Ok(Self {
            pool,
            dice_type,
            explode_min,
            threshold,
        })
    }

    /// Params this notation describes. Explosions cover `explode_min..=sides`.
    pub fn to_params(&self) -> RollParams {
        RollParams::new(
            self.pool,
            self.explode_min..=self.dice_type.sides(),
            self.threshold,
            self.dice_type,
        )
    }
}

impl From<&RollParams> for RollNotation {
    fn from(params: &RollParams) -> Self {
        Self {
            pool: params.pool,
            dice_type: params.dice_type,
            explode_min: explosion_floor(&params.explosion_thresholds)
                .unwrap_or_else(|| params.dice_type.sides()),
            threshold: params.threshold,
        }
    }
}

impl FromStr for RollNotation {
    type Err = NotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RollNotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}!>={}>={}",
            self.pool, self.dice_type, self.explode_min, self.threshold
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_from_params() {
        let params = RollParams::new(3, [9, 10], 7, DiceType::D10);
        assert_eq!(params.notation().to_string(), "3d10!>=9>=7");
    }

    #[test]
    fn test_explode_min_is_floor_of_set() {
        let params = RollParams::new(5, [10, 8, 9], 6, DiceType::D10);
        assert_eq!(params.notation().to_string(), "5d10!>=8>=6");
    }

    #[test]
    fn test_parse() {
        let notation: RollNotation = "3d10!>=9>=7".parse().unwrap();
        assert_eq!(notation.pool, 3);
        assert_eq!(notation.dice_type, DiceType::D10);
        assert_eq!(notation.explode_min, 9);
        assert_eq!(notation.threshold, 7);
    }

    #[test]
    fn test_parse_recovers_contiguous_params() {
        let params = RollParams::new(4, [9, 10], 7, DiceType::D10);
        let parsed = RollNotation::parse(&params.notation().to_string()).unwrap();
        assert_eq!(parsed.to_params(), params);
    }

    #[test]
    fn test_parse_case_and_whitespace() {
        let notation = RollNotation::parse("  2D10!>=10>=8 ").unwrap();
        assert_eq!(notation.pool, 2);
        assert_eq!(notation.explode_min, 10);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(RollNotation::parse(""), Err(NotationError::Empty));
        assert!(matches!(
            RollNotation::parse("3x10"),
            Err(NotationError::InvalidFormat(_))
        ));
        assert!(matches!(
            RollNotation::parse("3d10>=7"),
            Err(NotationError::InvalidFormat(_))
        ));
        assert!(matches!(
            RollNotation::parse("3d7!>=7>=5"),
            Err(NotationError::UnknownDiceType(_))
        ));
        assert!(matches!(
            RollNotation::parse("3d10!>=9"),
            Err(NotationError::InvalidFormat(_))
        ));
    }
}
