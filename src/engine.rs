use std::collections::HashSet;

use kurbo::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::core::Player;
use crate::error::{HudError, HudResult};
use crate::event::{EventId, EventList, HitEvent};

/// Tuning constants for the timeline simulation.
///
/// `hp_decay` and `shake_decay` are per-tick multipliers, not time-scaled
/// rates: the visual speed of the health chase and the shake falloff is
/// coupled to the tick rate the engine was constructed with. A time-based
/// decay (`rate^delta_time`) would only touch [`TimelineEngine::tick`]; no
/// call site encodes the coupling.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct TimelineConfig {
    pub max_health: f64,
    /// Fraction of the display/target gap closed per tick once the hold
    /// window has passed.
    pub hp_decay: f64,
    /// Post-hit hold window in seconds during which the display health
    /// freezes, letting the damage trail register before it drains.
    pub hit_delay: f64,
    pub shake_intensity: f64,
    pub super_shake_multiplier: f64,
    /// Per-tick shake multiplier.
    pub shake_decay: f64,
    /// Magnitudes below this snap to exactly zero.
    pub shake_floor: f64,
    pub drive_max: f64,
    /// Drive regeneration per second.
    pub drive_regen_rate: f64,
    /// Forward epsilon so events landing exactly on a tick boundary are not
    /// missed.
    pub event_epsilon: f64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            hp_decay: 0.1,
            hit_delay: 0.15,
            shake_intensity: 3.0,
            super_shake_multiplier: 2.0,
            shake_decay: 0.8,
            shake_floor: 0.1,
            drive_max: 6.0,
            drive_regen_rate: 0.5,
            event_epsilon: 1e-6,
        }
    }
}

/// Per-player simulation state.
#[derive(Clone, Copy, Debug, serde::Serialize)]
pub struct CombatantState {
    /// Authoritative HP after all applied hits.
    pub health_target: f64,
    /// Animated HP shown on screen; lags behind the target, never below it
    /// except at the instant of a seek snap.
    pub health_display: f64,
    /// Drive gauge in `[0, drive_max]`. Regenerates over time; the engine
    /// never spends it.
    pub drive: f64,
    /// Time of the most recent hit taken, `NEG_INFINITY` if never hit.
    pub last_hit_time: f64,
}

impl CombatantState {
    fn initial(config: &TimelineConfig) -> Self {
        Self {
            health_target: config.max_health,
            health_display: config.max_health,
            drive: config.drive_max,
            last_hit_time: f64::NEG_INFINITY,
        }
    }
}

/// Immutable state snapshot produced by [`TimelineEngine::get_state`].
///
/// The shake offset is sampled once per tick and cached here, so every
/// consumer of one simulated frame sees the same jitter.
#[derive(Clone, Copy, Debug, serde::Serialize)]
pub struct EngineSnapshot {
    pub time: f64,
    pub p1: CombatantState,
    pub p2: CombatantState,
    pub shake_magnitude: f64,
    pub shake_offset: Vec2,
}

const DEFAULT_SHAKE_SEED: u64 = 0x68_75_64_73_68_61_6b_65; // "hudshake"

/// Deterministic timeline state: turns a sparse, sorted hit-event list into
/// continuous per-frame combatant state, correct under both incremental
/// ticking and random-access seeking.
pub struct TimelineEngine {
    config: TimelineConfig,
    tick_duration: f64,
    current_time: f64,
    previous_time: f64,
    events: EventList,
    /// Events applied in the current forward session, keyed by stable id so
    /// host index churn cannot double-apply a hit.
    applied: HashSet<EventId>,
    p1: CombatantState,
    p2: CombatantState,
    shake_magnitude: f64,
    shake_offset: Vec2,
    rng: Pcg32,
}

impl TimelineEngine {
    /// Engine with the reference configuration at the given tick rate.
    pub fn new(fps: f64) -> HudResult<Self> {
        Self::with_config(fps, TimelineConfig::default())
    }

    pub fn with_config(fps: f64, config: TimelineConfig) -> HudResult<Self> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(HudError::invalid_configuration(
                "fps must be finite and > 0",
            ));
        }
        Ok(Self {
            tick_duration: 1.0 / fps,
            current_time: 0.0,
            previous_time: 0.0,
            events: EventList::new(),
            applied: HashSet::new(),
            p1: CombatantState::initial(&config),
            p2: CombatantState::initial(&config),
            shake_magnitude: 0.0,
            shake_offset: Vec2::ZERO,
            rng: Pcg32::seed_from_u64(DEFAULT_SHAKE_SEED),
            config,
        })
    }

    /// Reseed the shake RNG, for hosts that want run-to-run variation.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Pcg32::seed_from_u64(seed);
        self
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    /// Seconds per tick (`1 / fps`).
    pub fn tick_duration(&self) -> f64 {
        self.tick_duration
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn events(&self) -> &EventList {
        &self.events
    }

    /// Insert a hit event preserving sort order. Does not touch simulated
    /// time.
    pub fn add_event(
        &mut self,
        timestamp: f64,
        attacker: Player,
        damage: f64,
        is_super: bool,
    ) -> EventId {
        self.events.insert(HitEvent {
            timestamp,
            attacker,
            damage,
            is_super,
        })
    }

    /// Remove the event at `index`, dropping its applied marker if any.
    pub fn remove_event(&mut self, index: usize) -> HudResult<HitEvent> {
        let (id, event) = self.events.remove(index)?;
        self.applied.remove(&id);
        Ok(event)
    }

    /// Replace the whole event list (e.g. after loading a script). Clears
    /// the applied markers; the host decides when to `reset` or `seek_to`.
    pub fn set_events(&mut self, events: EventList) {
        self.events = events;
        self.applied.clear();
    }

    /// Advance simulated time by `delta_time` seconds and run one full
    /// state transition. Never fails; all numeric edges clamp.
    pub fn tick(&mut self, delta_time: f64) {
        self.previous_time = self.current_time;
        self.current_time += delta_time;

        let due: Vec<(EventId, HitEvent)> = self
            .events
            .iter()
            .filter(|(id, e)| {
                !self.applied.contains(id)
                    && self.previous_time < e.timestamp
                    && e.timestamp <= self.current_time + self.config.event_epsilon
            })
            .map(|(id, e)| (id, *e))
            .collect();
        for (id, event) in due {
            self.apply_hit(&event);
            self.applied.insert(id);
        }

        let d1 = self.chase_display(&self.p1);
        let d2 = self.chase_display(&self.p2);
        self.p1.health_display = d1;
        self.p2.health_display = d2;

        self.shake_magnitude *= self.config.shake_decay;
        if self.shake_magnitude < self.config.shake_floor {
            self.shake_magnitude = 0.0;
        }

        // Clamped on both ends: a negative delta must not drag the gauge
        // below zero.
        let regen = self.config.drive_regen_rate * delta_time;
        self.p1.drive = (self.p1.drive + regen).clamp(0.0, self.config.drive_max);
        self.p2.drive = (self.p2.drive + regen).clamp(0.0, self.config.drive_max);

        self.shake_offset = self.sample_shake_offset();
    }

    /// Recompute state for an arbitrary absolute time, instantaneously.
    ///
    /// Health targets match what forward ticking to the same time produces;
    /// displays snap to their targets and shake is forced to zero, since a
    /// seek is a static preview rather than a live hit moment.
    #[tracing::instrument(skip(self))]
    pub fn seek_to(&mut self, target_time: f64) {
        self.reset();
        self.current_time = target_time;
        self.previous_time = target_time;

        let due: Vec<(EventId, HitEvent)> = self
            .events
            .iter()
            .filter(|(_, e)| e.timestamp <= target_time)
            .map(|(id, e)| (id, *e))
            .collect();
        for (id, event) in due {
            self.apply_hit(&event);
            self.applied.insert(id);
        }

        self.p1.health_display = self.p1.health_target;
        self.p2.health_display = self.p2.health_target;
        self.shake_magnitude = 0.0;
        self.shake_offset = Vec2::ZERO;
    }

    /// Restore initial combatant state and clear the applied markers. The
    /// event list is preserved.
    pub fn reset(&mut self) {
        self.current_time = 0.0;
        self.previous_time = 0.0;
        self.applied.clear();
        self.p1 = CombatantState::initial(&self.config);
        self.p2 = CombatantState::initial(&self.config);
        self.shake_magnitude = 0.0;
        self.shake_offset = Vec2::ZERO;
    }

    /// Read-only snapshot of the current state. Never simulates.
    pub fn get_state(&self) -> EngineSnapshot {
        EngineSnapshot {
            time: self.current_time,
            p1: self.p1,
            p2: self.p2,
            shake_magnitude: self.shake_magnitude,
            shake_offset: self.shake_offset,
        }
    }

    /// Spend drive on behalf of external gameplay logic. The engine itself
    /// never decreases drive; this is the only path down.
    pub fn spend_drive(&mut self, player: Player, amount: f64) {
        let max = self.config.drive_max;
        let c = match player {
            Player::One => &mut self.p1,
            Player::Two => &mut self.p2,
        };
        c.drive = (c.drive - amount.max(0.0)).clamp(0.0, max);
    }

    pub fn combatant(&self, player: Player) -> &CombatantState {
        match player {
            Player::One => &self.p1,
            Player::Two => &self.p2,
        }
    }

    fn apply_hit(&mut self, event: &HitEvent) {
        let max_health = self.config.max_health;
        let now = self.current_time;
        let defender = match event.attacker.opponent() {
            Player::One => &mut self.p1,
            Player::Two => &mut self.p2,
        };
        defender.health_target = (defender.health_target - event.damage).clamp(0.0, max_health);
        defender.last_hit_time = now;

        let mult = if event.is_super {
            self.config.super_shake_multiplier
        } else {
            1.0
        };
        // Replaces, never adds to, residual shake from a prior hit.
        self.shake_magnitude = self.config.shake_intensity * mult;
    }

    fn chase_display(&self, c: &CombatantState) -> f64 {
        if c.health_display <= c.health_target {
            return c.health_target;
        }
        if self.current_time < c.last_hit_time + self.config.hit_delay {
            return c.health_display;
        }
        c.health_display * (1.0 - self.config.hp_decay) + c.health_target * self.config.hp_decay
    }

    fn sample_shake_offset(&mut self) -> Vec2 {
        if self.shake_magnitude <= 0.0 {
            return Vec2::ZERO;
        }
        let m = self.shake_magnitude;
        Vec2::new(self.rng.random_range(-m..=m), self.rng.random_range(-m..=m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f64 = 1.0 / 60.0;

    #[test]
    fn construction_rejects_bad_fps() {
        assert!(TimelineEngine::new(0.0).is_err());
        assert!(TimelineEngine::new(-30.0).is_err());
        assert!(TimelineEngine::new(f64::NAN).is_err());
        assert!(TimelineEngine::new(60.0).is_ok());
    }

    #[test]
    fn initial_state_is_full() {
        let engine = TimelineEngine::new(60.0).unwrap();
        let s = engine.get_state();
        assert_eq!(s.p1.health_target, 100.0);
        assert_eq!(s.p1.health_display, 100.0);
        assert_eq!(s.p1.drive, 6.0);
        assert_eq!(s.shake_magnitude, 0.0);
        assert_eq!(s.shake_offset, Vec2::ZERO);
        assert_eq!(s.p1.last_hit_time, f64::NEG_INFINITY);
    }

    #[test]
    fn hit_damages_the_defender_only() {
        let mut engine = TimelineEngine::new(60.0).unwrap();
        engine.add_event(0.05, Player::One, 25.0, false);
        for _ in 0..6 {
            engine.tick(DT);
        }
        let s = engine.get_state();
        assert_eq!(s.p1.health_target, 100.0);
        assert_eq!(s.p2.health_target, 75.0);
    }

    #[test]
    fn event_applies_at_most_once() {
        let mut engine = TimelineEngine::new(60.0).unwrap();
        engine.add_event(0.05, Player::One, 10.0, false);
        for _ in 0..60 {
            engine.tick(DT);
        }
        assert_eq!(engine.get_state().p2.health_target, 90.0);
    }

    #[test]
    fn negative_damage_heals_up_to_the_clamp() {
        let mut engine = TimelineEngine::new(60.0).unwrap();
        engine.add_event(0.02, Player::One, 30.0, false);
        engine.add_event(0.04, Player::One, -80.0, false);
        for _ in 0..4 {
            engine.tick(DT);
        }
        assert_eq!(engine.get_state().p2.health_target, 100.0);
    }

    #[test]
    fn overkill_clamps_to_zero() {
        let mut engine = TimelineEngine::new(60.0).unwrap();
        engine.add_event(0.02, Player::Two, 500.0, true);
        for _ in 0..4 {
            engine.tick(DT);
        }
        assert_eq!(engine.get_state().p1.health_target, 0.0);
    }

    #[test]
    fn drive_regenerates_and_saturates() {
        let mut engine = TimelineEngine::new(60.0).unwrap();
        engine.tick(DT);
        // Already full: regen must not overfill.
        assert_eq!(engine.get_state().p1.drive, 6.0);

        engine.spend_drive(Player::One, 2.0);
        assert_eq!(engine.get_state().p1.drive, 4.0);
        // 0.5/s regen: one second of ticks recovers half a segment.
        for _ in 0..60 {
            engine.tick(DT);
        }
        assert!((engine.get_state().p1.drive - 4.5).abs() < 1e-9);

        engine.spend_drive(Player::One, 100.0);
        assert_eq!(engine.get_state().p1.drive, 0.0);
    }

    #[test]
    fn backward_delta_cannot_drain_drive_below_zero() {
        let mut engine = TimelineEngine::new(60.0).unwrap();
        engine.spend_drive(Player::One, 5.9);
        assert!((engine.get_state().p1.drive - 0.1).abs() < 1e-9);
        // Regen for a negative delta is negative; the gauge floors at zero.
        engine.tick(-1.0);
        let s = engine.get_state();
        assert_eq!(s.p1.drive, 0.0);
        assert!((s.p2.drive - 5.5).abs() < 1e-9);
    }

    #[test]
    fn multiple_events_in_one_tick_apply_in_order() {
        let mut engine = TimelineEngine::new(60.0).unwrap();
        engine.add_event(0.2, Player::One, 10.0, false);
        engine.add_event(0.4, Player::One, 10.0, true);
        // One large tick crosses both; shake ends at the later (super) hit.
        engine.tick(0.5);
        let s = engine.get_state();
        assert_eq!(s.p2.health_target, 80.0);
        // 6.0 from the super hit, one decay pass in the same tick.
        assert!((s.shake_magnitude - 6.0 * 0.8).abs() < 1e-9);
    }

    #[test]
    fn shake_offset_is_stable_across_reads() {
        let mut engine = TimelineEngine::new(60.0).unwrap();
        engine.add_event(0.01, Player::One, 10.0, true);
        engine.tick(DT);
        let first = engine.get_state().shake_offset;
        let second = engine.get_state().shake_offset;
        assert_eq!(first, second);
        let m = engine.get_state().shake_magnitude;
        assert!(first.x.abs() <= m && first.y.abs() <= m);
    }

    #[test]
    fn shake_offset_is_deterministic_for_a_seed() {
        let run = |seed: u64| {
            let mut engine = TimelineEngine::new(60.0).unwrap().with_seed(seed);
            engine.add_event(0.01, Player::One, 10.0, true);
            engine.tick(DT);
            engine.get_state().shake_offset
        };
        assert_eq!(run(7), run(7));
    }

    #[test]
    fn reset_preserves_events() {
        let mut engine = TimelineEngine::new(60.0).unwrap();
        engine.add_event(0.05, Player::One, 10.0, false);
        for _ in 0..12 {
            engine.tick(DT);
        }
        engine.reset();
        let s = engine.get_state();
        assert_eq!(s.time, 0.0);
        assert_eq!(s.p2.health_target, 100.0);
        assert_eq!(engine.events().len(), 1);
        // The cleared markers allow the event to apply again.
        for _ in 0..12 {
            engine.tick(DT);
        }
        assert_eq!(engine.get_state().p2.health_target, 90.0);
    }

    #[test]
    fn remove_event_reports_out_of_range() {
        let mut engine = TimelineEngine::new(60.0).unwrap();
        assert!(matches!(
            engine.remove_event(0),
            Err(crate::HudError::OutOfRange(_))
        ));
        engine.add_event(1.0, Player::Two, 5.0, false);
        assert!(engine.remove_event(0).is_ok());
    }

    #[test]
    fn removing_an_applied_event_keeps_bookkeeping_consistent() {
        let mut engine = TimelineEngine::new(60.0).unwrap();
        engine.add_event(0.05, Player::One, 10.0, false);
        engine.add_event(0.5, Player::One, 10.0, false);
        for _ in 0..6 {
            engine.tick(DT);
        }
        assert_eq!(engine.get_state().p2.health_target, 90.0);
        // Remove the already-applied first event; the second still applies
        // exactly once despite its index shifting.
        engine.remove_event(0).unwrap();
        for _ in 0..60 {
            engine.tick(DT);
        }
        assert_eq!(engine.get_state().p2.health_target, 80.0);
    }

    #[test]
    fn seek_snaps_display_and_clears_shake() {
        let mut engine = TimelineEngine::new(60.0).unwrap();
        engine.add_event(1.0, Player::One, 35.0, true);
        engine.seek_to(2.0);
        let s = engine.get_state();
        assert_eq!(s.time, 2.0);
        assert_eq!(s.p2.health_target, 65.0);
        assert_eq!(s.p2.health_display, 65.0);
        assert_eq!(s.shake_magnitude, 0.0);
        assert_eq!(s.shake_offset, Vec2::ZERO);
    }

    #[test]
    fn seek_is_repeatable() {
        let mut engine = TimelineEngine::new(60.0).unwrap();
        engine.add_event(0.3, Player::Two, 12.0, false);
        engine.add_event(0.9, Player::One, 7.0, false);
        engine.seek_to(1.0);
        let a = engine.get_state();
        engine.seek_to(1.0);
        let b = engine.get_state();
        assert_eq!(a.p1.health_target, b.p1.health_target);
        assert_eq!(a.p2.health_target, b.p2.health_target);
        assert_eq!(a.p1.drive, b.p1.drive);
    }
}
