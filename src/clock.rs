use rand::Rng;
use serde::Serialize;
use std::time::Duration;

use crate::reaction::{is_bubbling, ReactionSnapshot, ReactionType, Controls, BOILING_POINT};

pub const DEFAULT_TICK: Duration = Duration::from_millis(500);

/// Degrees gained per tick for each percent of heating power
const HEATING_RATE: f64 = 0.1;
const PRESSURE_STEP: f64 = 0.02;
const MAX_PRESSURE: f64 = 2.0;
const PROGRESS_STEP: f64 = 2.0;
const PH_JITTER: f64 = 0.05;
const TEMPERATURE_JITTER: f64 = 0.25;

/// One point on the trend chart. Carries display jitter, never fed back into the snapshot.
///
/// The history is unbounded while the clock runs (one sample per tick, about 172k a
/// day at 500 ms) because CSV export writes all of it. Only `reset` clears it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub time: f64,
    pub ph: f64,
    pub temperature: f64,
}

#[derive(Debug, Clone)]
pub struct ExperimentClock {
    interval: Duration,
    running: bool,
    ticks: u64,
    samples: Vec<Sample>,
}

impl Default for ExperimentClock {
    fn default() -> Self {
        ExperimentClock::new(DEFAULT_TICK)
    }
}

impl ExperimentClock {
    pub fn new(interval: Duration) -> Self {
        ExperimentClock {
            interval,
            running: false,
            ticks: 0,
            samples: Vec::new(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Stops the clock and drops the recorded history
    pub fn reset(&mut self) {
        self.running = false;
        self.ticks = 0;
        self.samples.clear();
    }

    /// Advance one interval. Returns `None` while paused.
    pub fn tick<R: Rng>(
        &mut self,
        snapshot: &ReactionSnapshot,
        controls: &Controls,
        rng: &mut R,
    ) -> Option<ReactionSnapshot> {
        if !self.running {
            return None;
        }

        let mut next = snapshot.clone();
        next.temperature = (snapshot.temperature + controls.heating_power * HEATING_RATE).min(BOILING_POINT);
        next.is_boiling = next.temperature >= BOILING_POINT;
        next.is_bubbling = is_bubbling(next.has_gas_evolution, controls.stirring_speed);

        if next.has_gas_evolution {
            next.pressure = (next.pressure + PRESSURE_STEP).min(MAX_PRESSURE);
        }
        if next.reaction_type != ReactionType::None {
            let rate = PROGRESS_STEP * (1.0 + controls.stirring_speed / 1000.0);
            next.reaction_progress = (next.reaction_progress + rate).min(100.0);
        }

        self.ticks += 1;
        let time = self.ticks as f64 * self.interval.as_secs_f64();
        self.samples.push(Sample {
            time,
            ph: next.ph + rng.gen_range(-PH_JITTER..=PH_JITTER),
            temperature: next.temperature + rng.gen_range(-TEMPERATURE_JITTER..=TEMPERATURE_JITTER),
        });

        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reaction::derive;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn heating(power: f64) -> Controls {
        Controls {
            heating_power: power,
            ..Controls::default()
        }
    }

    #[test]
    fn test_paused_clock_does_nothing() {
        let mut clock = ExperimentClock::default();
        let mut rng = StdRng::seed_from_u64(1);
        let snap = ReactionSnapshot::default();
        assert!(clock.tick(&snap, &heating(50.0), &mut rng).is_none());
        assert!(clock.samples().is_empty());
        assert_eq!(clock.ticks(), 0);
    }

    #[test]
    fn test_heating_reaches_boiling() {
        let mut clock = ExperimentClock::default();
        let mut rng = StdRng::seed_from_u64(7);
        let controls = heating(50.0);
        clock.start();

        let mut snap = ReactionSnapshot::default();
        for n in 1..=16u32 {
            snap = clock.tick(&snap, &controls, &mut rng).unwrap();
            let expected = 20.0 + n as f64 * 5.0;
            assert!((snap.temperature - expected).abs() < 1e-9);
            assert_eq!(snap.is_boiling, expected >= 100.0);
        }
        assert!(snap.is_boiling);
        assert_eq!(snap.temperature, 100.0);
        assert!(clock.tick(&snap, &controls, &mut rng).unwrap().temperature <= 100.0);
    }

    #[test]
    fn test_boiling_first_true_at_sixteenth_tick() {
        let mut clock = ExperimentClock::default();
        let mut rng = StdRng::seed_from_u64(3);
        let controls = heating(50.0);
        clock.start();

        let mut snap = ReactionSnapshot::default();
        let mut first_boil = None;
        for n in 1..=20u32 {
            snap = clock.tick(&snap, &controls, &mut rng).unwrap();
            if snap.is_boiling && first_boil.is_none() {
                first_boil = Some(n);
            }
        }
        assert_eq!(first_boil, Some(16));
    }

    #[test]
    fn test_jitter_stays_in_samples() {
        let mut clock = ExperimentClock::default();
        let mut rng = StdRng::seed_from_u64(42);
        clock.start();

        let snap = ReactionSnapshot::default();
        let next = clock.tick(&snap, &Controls::default(), &mut rng).unwrap();
        assert_eq!(next.ph, 7.0);
        assert_eq!(next.temperature, 20.0);

        let sample = clock.samples()[0];
        assert_eq!(sample.time, 0.5);
        assert!((sample.ph - 7.0).abs() <= PH_JITTER);
        assert!((sample.temperature - 20.0).abs() <= TEMPERATURE_JITTER);
    }

    #[test]
    fn test_gas_evolution_raises_pressure_and_progress() {
        let mut clock = ExperimentClock::default();
        let mut rng = StdRng::seed_from_u64(5);
        clock.start();

        let components: Vec<String> = ["HCl", "HCl", "NaOH"].iter().map(|s| s.to_string()).collect();
        let mut snap = derive(&components, &Controls::default(), &ReactionSnapshot::default());
        let mut last_progress = snap.reaction_progress;
        for _ in 0..100 {
            snap = clock.tick(&snap, &Controls::default(), &mut rng).unwrap();
            assert!(snap.reaction_progress >= last_progress);
            last_progress = snap.reaction_progress;
        }
        assert_eq!(snap.pressure, MAX_PRESSURE);
        assert_eq!(snap.reaction_progress, 100.0);
        assert!(snap.is_bubbling);
    }

    #[test]
    fn test_no_reaction_no_progress() {
        let mut clock = ExperimentClock::default();
        let mut rng = StdRng::seed_from_u64(9);
        clock.start();
        let snap = clock
            .tick(&ReactionSnapshot::default(), &Controls::default(), &mut rng)
            .unwrap();
        assert_eq!(snap.reaction_progress, 0.0);
        assert_eq!(snap.pressure, 1.0);
    }

    #[test]
    fn test_stirring_writes_bubbling_flag() {
        let mut clock = ExperimentClock::default();
        let mut rng = StdRng::seed_from_u64(11);
        clock.start();
        let stirred = Controls {
            stirring_speed: 300.0,
            ..Controls::default()
        };
        let snap = clock.tick(&ReactionSnapshot::default(), &stirred, &mut rng).unwrap();
        assert!(snap.is_bubbling);
        let calm = clock.tick(&snap, &Controls::default(), &mut rng).unwrap();
        assert!(!calm.is_bubbling);
    }

    #[test]
    fn test_reset_clears_history() {
        let mut clock = ExperimentClock::default();
        let mut rng = StdRng::seed_from_u64(2);
        clock.start();
        clock.tick(&ReactionSnapshot::default(), &Controls::default(), &mut rng);
        clock.reset();
        assert!(!clock.is_running());
        assert!(clock.samples().is_empty());
        assert_eq!(clock.ticks(), 0);
    }
}
