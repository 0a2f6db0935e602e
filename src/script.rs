use std::path::Path;

use anyhow::Context;

use crate::core::Player;
use crate::error::{HudError, HudResult};
use crate::event::{EventList, HitEvent};

fn default_damage() -> f64 {
    10.0
}

/// On-disk hit entry. `player` is the attacker as `1` or `2`; omitted
/// `damage` defaults to 10.0 and omitted `is_super` to false.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HitRecord {
    pub timestamp: f64,
    pub player: u8,
    #[serde(default = "default_damage")]
    pub damage: f64,
    #[serde(default)]
    pub is_super: bool,
}

/// Persistence contract for one timeline's event list: a plain record that
/// fully reconstructs, and is fully serialized from, an [`EventList`].
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MatchScript {
    #[serde(default)]
    pub hits: Vec<HitRecord>,
}

impl MatchScript {
    pub fn from_events(events: &EventList) -> Self {
        Self {
            hits: events
                .iter()
                .map(|(_, e)| HitRecord {
                    timestamp: e.timestamp,
                    player: e.attacker.number(),
                    damage: e.damage,
                    is_super: e.is_super,
                })
                .collect(),
        }
    }

    /// Rebuild a sorted event list. Records may appear in any order; the
    /// list's insertion sort restores the ascending-timestamp invariant.
    pub fn to_events(&self) -> HudResult<EventList> {
        let mut events = EventList::new();
        for record in &self.hits {
            events.insert(HitEvent {
                timestamp: record.timestamp,
                attacker: Player::from_number(record.player)?,
                damage: record.damage,
                is_super: record.is_super,
            });
        }
        Ok(events)
    }

    pub fn from_json_str(json: &str) -> HudResult<Self> {
        serde_json::from_str(json).map_err(|e| HudError::serde(format!("parse match script: {e}")))
    }

    pub fn to_json_string_pretty(&self) -> HudResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| HudError::serde(format!("encode match script: {e}")))
    }

    pub fn load_json(path: &Path) -> HudResult<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("read match script '{}'", path.display()))?;
        Self::from_json_str(&json)
    }

    pub fn save_json(&self, path: &Path) -> HudResult<()> {
        let json = self.to_json_string_pretty()?;
        std::fs::write(path, json)
            .with_context(|| format!("write match script '{}'", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_omitted_fields() {
        let script =
            MatchScript::from_json_str(r#"{"hits": [{"timestamp": 1.5, "player": 2}]}"#).unwrap();
        assert_eq!(script.hits.len(), 1);
        assert_eq!(script.hits[0].damage, 10.0);
        assert!(!script.hits[0].is_super);
    }

    #[test]
    fn unsorted_records_reconstruct_sorted_events() {
        let script = MatchScript {
            hits: vec![
                HitRecord {
                    timestamp: 5.0,
                    player: 1,
                    damage: 8.0,
                    is_super: false,
                },
                HitRecord {
                    timestamp: 1.0,
                    player: 2,
                    damage: 12.0,
                    is_super: true,
                },
            ],
        };
        let events = script.to_events().unwrap();
        let times: Vec<f64> = events.iter().map(|(_, e)| e.timestamp).collect();
        assert_eq!(times, vec![1.0, 5.0]);
    }

    #[test]
    fn round_trip_preserves_records() {
        let script = MatchScript {
            hits: vec![HitRecord {
                timestamp: 2.25,
                player: 1,
                damage: 15.0,
                is_super: true,
            }],
        };
        let events = script.to_events().unwrap();
        let back = MatchScript::from_events(&events);
        assert_eq!(back, script);

        let json = script.to_json_string_pretty().unwrap();
        assert_eq!(MatchScript::from_json_str(&json).unwrap(), script);
    }

    #[test]
    fn bad_player_id_is_out_of_range() {
        let script =
            MatchScript::from_json_str(r#"{"hits": [{"timestamp": 0.0, "player": 7}]}"#).unwrap();
        assert!(matches!(
            script.to_events(),
            Err(crate::HudError::OutOfRange(_))
        ));
    }
}
