use crate::error::{HudError, HudResult};

/// RGBA8 brush color carried through Parley label layouts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LabelBrush {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// A loaded label font: raw bytes for Parley registration plus the
/// `vello_cpu` handle used when filling glyph runs.
#[derive(Clone)]
pub struct LabelFont {
    bytes: Vec<u8>,
    font: vello_cpu::peniko::FontData,
    blob_id: u64,
}

impl LabelFont {
    pub fn from_bytes(bytes: Vec<u8>) -> HudResult<Self> {
        if bytes.is_empty() {
            return Err(HudError::asset("font bytes are empty"));
        }
        let blob = vello_cpu::peniko::Blob::from(bytes.clone());
        let blob_id = blob.id();
        let font = vello_cpu::peniko::FontData::new(blob, 0);
        Ok(Self {
            bytes,
            font,
            blob_id,
        })
    }

    pub fn from_file(path: &std::path::Path) -> HudResult<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| HudError::asset(format!("read font '{}': {e}", path.display())))?;
        Self::from_bytes(bytes)
    }

    /// Probe a handful of common system font locations. `None` means the
    /// host platform offered nothing usable; callers degrade, not fail.
    pub fn system_default() -> Option<Self> {
        const CANDIDATES: &[&str] = &[
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/TTF/DejaVuSans.ttf",
            "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
            "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
            "/System/Library/Fonts/Supplemental/Arial.ttf",
            "C:\\Windows\\Fonts\\arial.ttf",
        ];
        for path in CANDIDATES {
            if let Ok(bytes) = std::fs::read(path)
                && let Ok(font) = Self::from_bytes(bytes)
            {
                return Some(font);
            }
        }
        None
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn font_data(&self) -> &vello_cpu::peniko::FontData {
        &self.font
    }

    /// Identity of the underlying font data. Clones share it, so caches
    /// keyed on it survive the per-call font clone in the draw path.
    pub(crate) fn blob_id(&self) -> u64 {
        self.blob_id
    }
}

/// Stateful helper for building Parley layouts for single-style label text.
pub(crate) struct LabelLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<LabelBrush>,
    /// Last registered font (by blob id) and its resolved family name.
    /// Re-registering the same bytes every call would grow the collection
    /// unboundedly over a long batch export.
    registered: Option<(u64, String)>,
}

impl LabelLayoutEngine {
    pub(crate) fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            registered: None,
        }
    }

    /// Shape and lay out one unwrapped label line. The returned layout's
    /// `width()` is the measured advance used for right-aligned anchoring.
    pub(crate) fn layout_label(
        &mut self,
        text: &str,
        font: &LabelFont,
        size_px: f32,
        brush: LabelBrush,
    ) -> HudResult<parley::Layout<LabelBrush>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(HudError::invalid_configuration(
                "label size_px must be finite and > 0",
            ));
        }

        let family_name = match &self.registered {
            Some((id, name)) if *id == font.blob_id() => name.clone(),
            _ => {
                let families = self.font_ctx.collection.register_fonts(
                    parley::fontique::Blob::from(font.bytes().to_vec()),
                    None,
                );
                let family_id = families
                    .first()
                    .map(|(id, _)| *id)
                    .ok_or_else(|| HudError::asset("no font families registered from font bytes"))?;
                let name = self
                    .font_ctx
                    .collection
                    .family_name(family_id)
                    .ok_or_else(|| HudError::asset("registered font family has no name"))?
                    .to_string();
                self.registered = Some((font.blob_id(), name.clone()));
                name
            }
        };

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family_name)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<LabelBrush> = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_font_bytes_are_rejected() {
        assert!(matches!(
            LabelFont::from_bytes(Vec::new()),
            Err(HudError::Asset(_))
        ));
    }

    #[test]
    fn missing_font_file_is_an_asset_error() {
        let err = LabelFont::from_file(std::path::Path::new("/nonexistent/font.ttf"));
        assert!(matches!(err, Err(HudError::Asset(_))));
    }

    #[test]
    fn layout_rejects_nonpositive_size() {
        let mut engine = LabelLayoutEngine::new();
        let Some(font) = LabelFont::system_default() else {
            // No system fonts on this machine; nothing to lay out.
            return;
        };
        assert!(engine.layout_label("P1", &font, 0.0, LabelBrush::default()).is_err());
        assert!(
            engine
                .layout_label("P1", &font, f32::NAN, LabelBrush::default())
                .is_err()
        );
    }

    #[test]
    fn repeated_layouts_register_the_font_once() {
        let mut engine = LabelLayoutEngine::new();
        let Some(font) = LabelFont::system_default() else {
            return;
        };
        engine
            .layout_label("P1", &font, 24.0, LabelBrush::default())
            .unwrap();
        let first = engine.registered.clone();
        assert!(first.is_some());
        // A second layout through a cloned handle, as the draw path takes,
        // reuses the cached registration instead of re-registering bytes.
        engine
            .layout_label("P2", &font.clone(), 24.0, LabelBrush::default())
            .unwrap();
        assert_eq!(engine.registered, first);
    }

    #[test]
    fn layout_measures_nonzero_width() {
        let mut engine = LabelLayoutEngine::new();
        let Some(font) = LabelFont::system_default() else {
            return;
        };
        let layout = engine
            .layout_label("PLAYER 1", &font, 24.0, LabelBrush::default())
            .unwrap();
        assert!(layout.width() > 0.0);
    }
}
