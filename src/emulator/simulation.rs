// hrm-emulator Source Code File
//
// Copyright 2026 The hrm-emulator Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! The simulated vital signs. Each metric follows its own bounded random walk; there is no
//! correlation between them.

use rand::distr::uniform::SampleUniform;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::{Error, Result};

/// A quantity a [`RandomWalk`] can range over.
pub trait WalkValue: SampleUniform + PartialOrd + Copy + Display {
    /// Adds an offset without overflowing. Integers saturate at their limits.
    fn offset(self, delta: Self) -> Self;

    fn is_finite(self) -> bool;

    /// Whether a uniform draw from `[low, high]` is well defined.
    fn can_sample(low: Self, high: Self) -> bool;
}

impl WalkValue for i32 {
    fn offset(self, delta: i32) -> i32 {
        self.saturating_add(delta)
    }

    fn is_finite(self) -> bool {
        true
    }

    fn can_sample(low: i32, high: i32) -> bool {
        low <= high
    }
}

impl WalkValue for f64 {
    fn offset(self, delta: f64) -> f64 {
        self + delta
    }

    fn is_finite(self) -> bool {
        f64::is_finite(self)
    }

    fn can_sample(low: f64, high: f64) -> bool {
        low <= high && (high - low).is_finite()
    }
}

/// Parameters of a bounded random walk. On every step a uniformly distributed offset in
/// `[step_down, step_up]` is added and the result is clamped to `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RandomWalk<T> {
    pub initial: T,
    pub min: T,
    pub max: T,
    pub step_down: T,
    pub step_up: T,
}

impl<T> RandomWalk<T>
where
    T: WalkValue,
{
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> T {
        rng.random_range(self.step_down..=self.step_up)
    }

    /// Applies an offset, keeping the result inside the bounds.
    pub fn apply(&self, value: T, delta: T) -> T {
        let next = value.offset(delta);
        if next < self.min {
            self.min
        } else if next > self.max {
            self.max
        } else {
            next
        }
    }

    // Written as negations so NaN bounds are rejected too.
    pub fn validate(&self, name: &str) -> Result<()> {
        if !(self.min <= self.max) {
            return Err(Error::InvalidConfig(format!(
                "{}: min {} is greater than max {}",
                name, self.min, self.max
            )));
        }
        let values = [self.initial, self.min, self.max, self.step_down, self.step_up];
        if !values.iter().all(|v| v.is_finite()) {
            return Err(Error::InvalidConfig(format!(
                "{}: bounds and steps must be finite",
                name
            )));
        }
        if !T::can_sample(self.step_down, self.step_up) {
            return Err(Error::InvalidConfig(format!(
                "{}: cannot draw steps from [{}, {}]",
                name, self.step_down, self.step_up
            )));
        }
        if !(self.min <= self.initial && self.initial <= self.max) {
            return Err(Error::InvalidConfig(format!(
                "{}: initial value {} is outside [{}, {}]",
                name, self.initial, self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Current values of the simulated metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimulationState {
    /// Beats per minute.
    pub heart_rate: i32,
    /// Blood oxygen saturation, in percent.
    pub spo2: f64,
    pub stress: i32,
}

/// Offsets applied by a single tick, before clamping.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Deltas {
    pub heart_rate: i32,
    pub spo2: f64,
    pub stress: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    pub heart_rate: RandomWalk<i32>,
    pub spo2: RandomWalk<f64>,
    pub stress: RandomWalk<i32>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            heart_rate: RandomWalk {
                initial: 72,
                min: 60,
                max: 120,
                step_down: -3,
                step_up: 5,
            },
            spo2: RandomWalk {
                initial: 97.5,
                min: 95.0,
                max: 99.0,
                step_down: -0.2,
                step_up: 0.2,
            },
            stress: RandomWalk {
                initial: 45,
                min: 30,
                max: 80,
                step_down: -2,
                step_up: 4,
            },
        }
    }
}

impl SimulationConfig {
    pub fn initial_state(&self) -> SimulationState {
        SimulationState {
            heart_rate: self.heart_rate.initial,
            spo2: self.spo2.initial,
            stress: self.stress.initial,
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Deltas {
        Deltas {
            heart_rate: self.heart_rate.sample(rng),
            spo2: self.spo2.sample(rng),
            stress: self.stress.sample(rng),
        }
    }

    pub fn apply(&self, state: &mut SimulationState, deltas: Deltas) {
        state.heart_rate = self.heart_rate.apply(state.heart_rate, deltas.heart_rate);
        state.spo2 = self.spo2.apply(state.spo2, deltas.spo2);
        state.stress = self.stress.apply(state.stress, deltas.stress);
    }

    pub fn validate(&self) -> Result<()> {
        self.heart_rate.validate("heart_rate")?;
        // Heart Rate Measurement carries the value as a single byte.
        if self.heart_rate.min < 0 || self.heart_rate.max > i32::from(u8::MAX) {
            return Err(Error::InvalidConfig(format!(
                "heart_rate: bounds [{}, {}] do not fit in 0-255 bpm",
                self.heart_rate.min, self.heart_rate.max
            )));
        }
        self.spo2.validate("spo2")?;
        self.stress.validate("stress")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn bounds_hold_for_long_walks() {
        let config = SimulationConfig::default();
        let mut state = config.initial_state();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10_000 {
            let deltas = config.sample(&mut rng);
            assert!((-3..=5).contains(&deltas.heart_rate));
            assert!((-0.2..=0.2).contains(&deltas.spo2));
            assert!((-2..=4).contains(&deltas.stress));
            config.apply(&mut state, deltas);
            assert!((60..=120).contains(&state.heart_rate));
            assert!((95.0..=99.0).contains(&state.spo2));
            assert!((30..=80).contains(&state.stress));
        }
    }

    #[test]
    fn large_offsets_are_clamped() {
        let config = SimulationConfig::default();
        let mut state = config.initial_state();
        config.apply(
            &mut state,
            Deltas {
                heart_rate: 1_000,
                spo2: -50.0,
                stress: -1_000,
            },
        );
        assert_eq!(state.heart_rate, 120);
        assert_eq!(state.spo2, 95.0);
        assert_eq!(state.stress, 30);
    }

    #[test]
    fn validate_rejects_inverted_bounds() {
        let mut config = SimulationConfig::default();
        config.stress.min = 90;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = SimulationConfig::default();
        config.spo2.step_down = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.heart_rate.initial = 150;
        assert!(config.validate().is_err());

        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_unusable_walks() {
        let mut config = SimulationConfig::default();
        config.spo2.step_down = f64::NEG_INFINITY;
        config.spo2.step_up = f64::INFINITY;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = SimulationConfig::default();
        config.spo2.max = f64::INFINITY;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.spo2.step_down = -f64::MAX;
        config.spo2.step_up = f64::MAX;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.heart_rate.max = 300;
        assert!(config.validate().is_err());
    }

    #[test]
    fn integer_walks_saturate_instead_of_overflowing() {
        let walk = RandomWalk {
            initial: i32::MAX,
            min: 0,
            max: i32::MAX,
            step_down: 0,
            step_up: 5,
        };
        assert!(walk.validate("stress").is_ok());
        assert_eq!(walk.apply(i32::MAX, 5), i32::MAX);
        assert_eq!(walk.apply(i32::MIN, -5), 0);
    }
}
