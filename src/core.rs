use crate::error::{HudError, HudResult};

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Create a validated canvas with non-zero dimensions.
    pub fn new(width: u32, height: u32) -> HudResult<Self> {
        if width == 0 || height == 0 {
            return Err(HudError::invalid_configuration(
                "canvas width/height must be > 0",
            ));
        }
        Ok(Self { width, height })
    }

    /// Buffer length for one RGBA8 frame of this canvas.
    pub(crate) fn byte_len(self) -> usize {
        (self.width as usize) * (self.height as usize) * 4
    }
}

/// One of the two combatants. The defender of a hit is always the
/// attacker's opponent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Player {
    One,
    Two,
}

impl Player {
    pub fn opponent(self) -> Self {
        match self {
            Self::One => Self::Two,
            Self::Two => Self::One,
        }
    }

    /// Wire representation used by the script format: `1` or `2`.
    pub fn number(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }

    pub fn from_number(n: u8) -> HudResult<Self> {
        match n {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            other => Err(HudError::out_of_range(format!(
                "player id must be 1 or 2, got {other}"
            ))),
        }
    }
}

/// Straight-alpha RGBA8 color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Premultiplied byte form `[r*a, g*a, b*a, a]`.
    pub fn premultiplied(self) -> [u8; 4] {
        fn premul(c: u8, a: u8) -> u8 {
            (((u16::from(c) * u16::from(a)) + 127) / 255) as u8
        }
        [
            premul(self.r, self.a),
            premul(self.g, self.a),
            premul(self.b, self.a),
            self.a,
        ]
    }
}
