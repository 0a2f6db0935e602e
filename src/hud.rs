use std::path::Path;

use anyhow::Context;
use kurbo::{Affine, BezPath, Point, Vec2};

use crate::composite::{
    blit_into_canvas, over_in_place, premultiply_rgba8_in_place, unpremultiply_rgba8_in_place,
};
use crate::core::{Canvas, Player, Rgba8};
use crate::error::{HudError, HudResult};
use crate::text::{LabelBrush, LabelFont, LabelLayoutEngine};

/// Health normalization used by the bar geometry.
const FULL_HEALTH: f64 = 100.0;
/// The drive gauge always has six segments.
const DRIVE_SEGMENTS: usize = 6;
const DRIVE_MAX: f64 = DRIVE_SEGMENTS as f64;

/// Static HUD geometry. All lengths in canvas pixels.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct HudLayout {
    pub bar_width: f64,
    pub bar_height: f64,
    /// Horizontal lean of the quad's top edge; mirrored left/right.
    pub bar_skew: f64,
    /// Distance from the canvas edge to each bar's outer end.
    pub margin_x: f64,
    pub bar_y: f64,
    pub gauge_height: f64,
    /// Vertical gap between bar bottom and gauge top.
    pub gauge_gap: f64,
    /// Horizontal shave per gauge segment.
    pub segment_pad: f64,
    pub label_size_px: f32,
    /// Vertical gap between bar bottom and label top.
    pub label_gap: f64,
    pub outline_width: f64,
}

impl Default for HudLayout {
    fn default() -> Self {
        Self {
            bar_width: 600.0,
            bar_height: 25.0,
            bar_skew: 20.0,
            margin_x: 50.0,
            bar_y: 60.0,
            gauge_height: 12.0,
            gauge_gap: 8.0,
            segment_pad: 4.0,
            label_size_px: 24.0,
            label_gap: 28.0,
            outline_width: 2.0,
        }
    }
}

impl HudLayout {
    fn bar_x(&self, canvas: Canvas, player: Player) -> f64 {
        match player {
            Player::One => self.margin_x,
            Player::Two => f64::from(canvas.width) - self.margin_x - self.bar_width,
        }
    }

    fn skew(&self, player: Player) -> f64 {
        match player {
            Player::One => -self.bar_skew,
            Player::Two => self.bar_skew,
        }
    }
}

/// HUD colors, straight alpha.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct HudPalette {
    pub track: Rgba8,
    pub damage: Rgba8,
    pub health: Rgba8,
    pub drive: Rgba8,
    pub drive_empty: Rgba8,
    pub outline: Rgba8,
    pub label: Rgba8,
}

impl Default for HudPalette {
    fn default() -> Self {
        Self {
            track: Rgba8::new(40, 40, 40, 51),
            damage: Rgba8::new(200, 50, 50, 255),
            health: Rgba8::new(240, 200, 30, 255),
            drive: Rgba8::new(50, 200, 100, 255),
            drive_empty: Rgba8::new(80, 80, 80, 255),
            outline: Rgba8::new(255, 255, 255, 140),
            label: Rgba8::new(255, 255, 255, 255),
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct StagedCombatant {
    target: f64,
    display: f64,
    resource: f64,
}

impl Default for StagedCombatant {
    fn default() -> Self {
        Self {
            target: FULL_HEALTH,
            display: FULL_HEALTH,
            resource: DRIVE_MAX,
        }
    }
}

/// Stateless compositing renderer: a pure function of staged combatant
/// values, a source frame, labels, and a shake offset.
///
/// The setters only stage inputs for the next [`render`](Self::render) call;
/// they hold no timing logic. Stage-then-render is one unit per frame.
pub struct OverlayRenderer {
    canvas: Canvas,
    layout: HudLayout,
    palette: HudPalette,
    p1: StagedCombatant,
    p2: StagedCombatant,
    font: Option<LabelFont>,
    text_engine: LabelLayoutEngine,
    warned_missing_font: bool,
}

impl OverlayRenderer {
    /// Renderer for the given output dimensions, with the default layout
    /// and palette. Tries to resolve a system font for labels; if none is
    /// found, labels degrade to nothing rather than failing renders.
    pub fn new(width: u32, height: u32) -> HudResult<Self> {
        let canvas = Canvas::new(width, height)?;
        if width > u32::from(u16::MAX) || height > u32::from(u16::MAX) {
            return Err(HudError::invalid_configuration(
                "canvas dimensions must fit in u16",
            ));
        }
        Ok(Self {
            canvas,
            layout: HudLayout::default(),
            palette: HudPalette::default(),
            p1: StagedCombatant::default(),
            p2: StagedCombatant::default(),
            font: LabelFont::system_default(),
            text_engine: LabelLayoutEngine::new(),
            warned_missing_font: false,
        })
    }

    pub fn with_font(mut self, font: LabelFont) -> Self {
        self.font = Some(font);
        self
    }

    pub fn with_layout(mut self, layout: HudLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_palette(mut self, palette: HudPalette) -> Self {
        self.palette = palette;
        self
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Stage health values for the next render, clamped to `[0, 100]`.
    pub fn set_health(&mut self, player: Player, target: f64, display: f64) {
        let s = self.staged_mut(player);
        s.target = target.clamp(0.0, FULL_HEALTH);
        s.display = display.clamp(0.0, FULL_HEALTH);
    }

    /// Stage the drive value for the next render, clamped to `[0, 6]`.
    /// Only the integer part fills gauge segments.
    pub fn set_resource(&mut self, player: Player, value: f64) {
        self.staged_mut(player).resource = value.clamp(0.0, DRIVE_MAX);
    }

    /// Composite the HUD over `source` (or a transparent canvas) and return
    /// a straight-alpha image of exactly the configured dimensions.
    ///
    /// Every HUD element is translated by `shake` on both axes.
    pub fn render(
        &mut self,
        source: Option<&image::RgbaImage>,
        p1_label: &str,
        p2_label: &str,
        shake: Vec2,
    ) -> HudResult<image::RgbaImage> {
        let Canvas { width, height } = self.canvas;

        // Base layer: the source frame cropped/padded to canvas size, in
        // premultiplied form so the HUD pixmap composites directly.
        let mut base = match source {
            Some(img) => {
                let mut bytes = blit_into_canvas(img, width, height);
                premultiply_rgba8_in_place(&mut bytes);
                bytes
            }
            None => vec![0u8; self.canvas.byte_len()],
        };

        let mut ctx = vello_cpu::RenderContext::new(width as u16, height as u16);
        ctx.set_transform(affine_to_cpu(Affine::translate(shake)));

        for player in [Player::One, Player::Two] {
            self.draw_health_bar(&mut ctx, player);
            self.draw_drive_gauge(&mut ctx, player);
        }
        self.draw_labels(&mut ctx, shake, p1_label, p2_label)?;

        ctx.flush();
        let mut hud = vello_cpu::Pixmap::new(width as u16, height as u16);
        ctx.render_to_pixmap(&mut hud);

        over_in_place(&mut base, hud.data_as_u8_slice())?;
        unpremultiply_rgba8_in_place(&mut base);

        image::RgbaImage::from_raw(width, height, base)
            .ok_or_else(|| HudError::invalid_configuration("canvas buffer length mismatch"))
    }

    /// Render, flatten onto an opaque background, and persist.
    #[tracing::instrument(skip(self, source))]
    pub fn render_to_file(
        &mut self,
        path: &Path,
        source: Option<&image::RgbaImage>,
        p1_label: &str,
        p2_label: &str,
        shake: Vec2,
    ) -> HudResult<()> {
        let rgba = self.render(source, p1_label, p2_label, shake)?;

        // Flattening over black is premultiplication with the alpha dropped.
        let mut bytes = rgba.into_raw();
        premultiply_rgba8_in_place(&mut bytes);
        let mut rgb = image::RgbImage::new(self.canvas.width, self.canvas.height);
        for (dst, src) in rgb.chunks_exact_mut(3).zip(bytes.chunks_exact(4)) {
            dst.copy_from_slice(&src[..3]);
        }
        rgb.save(path)
            .with_context(|| format!("write rendered frame '{}'", path.display()))?;
        Ok(())
    }

    fn staged(&self, player: Player) -> &StagedCombatant {
        match player {
            Player::One => &self.p1,
            Player::Two => &self.p2,
        }
    }

    fn staged_mut(&mut self, player: Player) -> &mut StagedCombatant {
        match player {
            Player::One => &mut self.p1,
            Player::Two => &mut self.p2,
        }
    }

    fn draw_health_bar(&self, ctx: &mut vello_cpu::RenderContext, player: Player) {
        let l = &self.layout;
        let s = self.staged(player);
        let x = l.bar_x(self.canvas, player);
        let skew = l.skew(player);
        let ow = l.outline_width;

        // Outline drawn as an enlarged quad under the track.
        fill_quad(
            ctx,
            x - ow,
            l.bar_y - ow,
            l.bar_width + 2.0 * ow,
            l.bar_height + 2.0 * ow,
            skew,
            self.palette.outline,
        );
        fill_quad(
            ctx,
            x,
            l.bar_y,
            l.bar_width,
            l.bar_height,
            skew,
            self.palette.track,
        );

        let health_w = l.bar_width * s.target / FULL_HEALTH;
        let trail_w = l.bar_width * (s.display - s.target) / FULL_HEALTH;

        // Fill is flush against the outer edge nearer the player's corner;
        // the damage trail sits where HP was just lost, between the fill's
        // inner end and the display level.
        if trail_w > 0.0 {
            let trail_x = match player {
                Player::One => x + health_w,
                Player::Two => x + l.bar_width - health_w - trail_w,
            };
            fill_quad(
                ctx,
                trail_x,
                l.bar_y,
                trail_w,
                l.bar_height,
                skew,
                self.palette.damage,
            );
        }
        if health_w > 0.0 {
            let fill_x = match player {
                Player::One => x,
                Player::Two => x + l.bar_width - health_w,
            };
            fill_quad(
                ctx,
                fill_x,
                l.bar_y,
                health_w,
                l.bar_height,
                skew,
                self.palette.health,
            );
        }
    }

    fn draw_drive_gauge(&self, ctx: &mut vello_cpu::RenderContext, player: Player) {
        let l = &self.layout;
        let filled = self.staged(player).resource.floor();
        let x = l.bar_x(self.canvas, player);
        let skew = l.skew(player);
        let gauge_y = l.bar_y + l.bar_height + l.gauge_gap;
        let block_w = l.bar_width / DRIVE_MAX;

        for i in 0..DRIVE_SEGMENTS {
            // Mirrored fill order: player 2's gauge fills right-to-left.
            let slot = match player {
                Player::One => i,
                Player::Two => DRIVE_SEGMENTS - 1 - i,
            };
            let block_x = x + (slot as f64) * block_w;
            let color = if (i as f64) < filled {
                self.palette.drive
            } else {
                self.palette.drive_empty
            };
            fill_quad(
                ctx,
                block_x,
                gauge_y,
                block_w - l.segment_pad,
                l.gauge_height,
                skew,
                color,
            );
        }
    }

    fn draw_labels(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        shake: Vec2,
        p1_label: &str,
        p2_label: &str,
    ) -> HudResult<()> {
        let Some(font) = self.font.clone() else {
            if !self.warned_missing_font {
                tracing::warn!("no label font available, rendering HUD without player labels");
                self.warned_missing_font = true;
            }
            return Ok(());
        };

        let l = self.layout;
        let label_y = l.bar_y + l.bar_height + l.label_gap;
        let brush = LabelBrush {
            r: self.palette.label.r,
            g: self.palette.label.g,
            b: self.palette.label.b,
            a: self.palette.label.a,
        };

        for (player, text) in [(Player::One, p1_label), (Player::Two, p2_label)] {
            if text.is_empty() {
                continue;
            }
            let layout = self
                .text_engine
                .layout_label(text, &font, l.label_size_px, brush)?;
            let bar_x = l.bar_x(self.canvas, player);
            // Right-aligned by measured width for player 2 so the label
            // never overruns the canvas edge.
            let text_x = match player {
                Player::One => bar_x,
                Player::Two => bar_x + l.bar_width - f64::from(layout.width()),
            };
            let origin = Affine::translate(Vec2::new(text_x, label_y));
            ctx.set_transform(affine_to_cpu(Affine::translate(shake) * origin));
            draw_glyph_layout(ctx, &font, &layout);
        }

        // Restore the plain shake transform for any later drawing.
        ctx.set_transform(affine_to_cpu(Affine::translate(shake)));
        Ok(())
    }
}

fn draw_glyph_layout(
    ctx: &mut vello_cpu::RenderContext,
    font: &LabelFont,
    layout: &parley::Layout<LabelBrush>,
) {
    for line in layout.lines() {
        for item in line.items() {
            let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                continue;
            };
            let brush = run.style().brush;
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                brush.r, brush.g, brush.b, brush.a,
            ));
            let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                id: g.id,
                x: g.x,
                y: g.y,
            });
            ctx.glyph_run(font.font_data())
                .font_size(run.run().font_size())
                .fill_glyphs(glyphs);
        }
    }
}

/// Fill a skewed quadrilateral: the top edge leads the bottom edge by
/// `skew`, so mirrored signs lean the two bars toward their own corners.
fn fill_quad(
    ctx: &mut vello_cpu::RenderContext,
    x: f64,
    y: f64,
    w: f64,
    h: f64,
    skew: f64,
    color: Rgba8,
) {
    let quad = skewed_quad(x, y, w, h, skew);
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
        color.r, color.g, color.b, color.a,
    ));
    ctx.fill_path(&bezpath_to_cpu(&quad));
}

fn skewed_quad(x: f64, y: f64, w: f64, h: f64, skew: f64) -> BezPath {
    let mut p = BezPath::new();
    p.move_to(Point::new(x + skew, y));
    p.line_to(Point::new(x + w + skew, y));
    p.line_to(Point::new(x + w, y + h));
    p.line_to(Point::new(x, y + h));
    p.close_path();
    p
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::LineTo(p) => out.line_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::QuadTo(p1, p2) => out.quad_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
            ),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
                vello_cpu::kurbo::Point::new(p3.x, p3.y),
            ),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}
