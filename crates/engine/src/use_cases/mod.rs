//! Use cases - User story orchestration.
//!
//! Each module contains use cases for a specific domain area.

pub mod playback;
pub mod roll;

pub use playback::{AnimationPlayer, PlaybackFrame};
pub use roll::{RollOutcome, RollUseCaseError, RollUseCases};
