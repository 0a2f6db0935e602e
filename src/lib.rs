#![forbid(unsafe_code)]

pub mod composite;
pub mod core;
pub mod engine;
pub mod error;
pub mod event;
pub mod hud;
pub mod script;
pub mod session;
pub mod text;

pub use core::{Canvas, Player, Rgba8};
pub use engine::{CombatantState, EngineSnapshot, TimelineConfig, TimelineEngine};
pub use error::{HudError, HudResult};
pub use event::{EventId, EventList, HitEvent};
pub use hud::{HudLayout, HudPalette, OverlayRenderer};
pub use script::{HitRecord, MatchScript};
pub use session::render_session;
pub use text::LabelFont;
