use crate::core::Player;
use crate::error::{HudError, HudResult};

/// Immutable timestamped hit. Events are never mutated after creation; the
/// list only inserts, removes, or replaces them wholesale.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HitEvent {
    /// Seconds from the start of the timeline.
    pub timestamp: f64,
    pub attacker: Player,
    /// Damage dealt to the defender. Negative values are accepted and heal
    /// up to the health clamp.
    pub damage: f64,
    pub is_super: bool,
}

/// Stable identity for an event within one [`EventList`].
///
/// Positional indices shift on insert/remove; ids are assigned once and
/// never reused, so hosts (and the engine's applied-once bookkeeping) can
/// reference events across list mutations.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct EventId(u64);

/// Hit events kept sorted ascending by timestamp, ties stable in insertion
/// order.
#[derive(Clone, Debug, Default)]
pub struct EventList {
    entries: Vec<(EventId, HitEvent)>,
    next_id: u64,
}

impl EventList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert preserving sort order. An event with a timestamp equal to
    /// existing entries goes after them.
    pub fn insert(&mut self, event: HitEvent) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        let at = self
            .entries
            .partition_point(|(_, e)| e.timestamp <= event.timestamp);
        self.entries.insert(at, (id, event));
        id
    }

    /// Remove by position. Later entries shift down; callers must not hold
    /// stale indices across mutations (use the returned ids instead).
    pub fn remove(&mut self, index: usize) -> HudResult<(EventId, HitEvent)> {
        if index >= self.entries.len() {
            return Err(HudError::out_of_range(format!(
                "event index {index} out of range (len {})",
                self.entries.len()
            )));
        }
        Ok(self.entries.remove(index))
    }

    pub fn get(&self, index: usize) -> Option<&HitEvent> {
        self.entries.get(index).map(|(_, e)| e)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ascending-timestamp iteration.
    pub fn iter(&self) -> impl Iterator<Item = (EventId, &HitEvent)> {
        self.entries.iter().map(|(id, e)| (*id, e))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
