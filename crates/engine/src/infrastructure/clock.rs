//! Clock and random implementations.

use crate::infrastructure::ports::{ClockPort, RandomPort};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// System clock - uses real time.
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockPort for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// System random - uses real randomness.
pub struct SystemRandom;

impl SystemRandom {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomPort for SystemRandom {
    fn gen_range(&self, min: u32, max: u32) -> u32 {
        use rand::Rng;
        rand::thread_rng().gen_range(min..=max)
    }

    fn gen_uuid(&self) -> Uuid {
        Uuid::new_v4()
    }
}

/// Fixed clock for testing.
#[cfg(test)]
pub struct FixedClock(pub DateTime<Utc>);

#[cfg(test)]
impl ClockPort for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Scripted dice for testing: hands out faces in order, then the minimum.
#[cfg(test)]
pub struct ScriptedRandom(std::sync::Mutex<std::collections::VecDeque<u32>>);

#[cfg(test)]
impl ScriptedRandom {
    pub fn new(faces: impl IntoIterator<Item = u32>) -> Self {
        Self(std::sync::Mutex::new(faces.into_iter().collect()))
    }

    pub fn remaining(&self) -> usize {
        self.0.lock().map(|faces| faces.len()).unwrap_or(0)
    }
}

#[cfg(test)]
impl RandomPort for ScriptedRandom {
    fn gen_range(&self, min: u32, _max: u32) -> u32 {
        self.0
            .lock()
            .ok()
            .and_then(|mut faces| faces.pop_front())
            .unwrap_or(min)
    }

    fn gen_uuid(&self) -> Uuid {
        Uuid::new_v4()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_random_stays_on_the_die() {
        let random = SystemRandom::new();
        for _ in 0..500 {
            let face = random.gen_range(1, 10);
            assert!((1..=10).contains(&face));
        }
    }

    #[test]
    fn scripted_random_replays_then_floors() {
        let random = ScriptedRandom::new([9, 4]);
        assert_eq!(random.gen_range(1, 10), 9);
        assert_eq!(random.gen_range(1, 10), 4);
        assert_eq!(random.gen_range(1, 10), 1);
        assert_eq!(random.remaining(), 0);
    }
}
