use crate::engine::TimelineEngine;
use crate::error::HudResult;
use crate::hud::OverlayRenderer;

/// Drive one engine/renderer pair over a batch of source frames.
///
/// The engine is reset, then for each frame one tick at the engine's own
/// tick duration is simulated, the snapshot is staged into the renderer,
/// and the frame is composited. Output order matches input order, and the
/// frame count always matches the input count.
#[tracing::instrument(skip_all)]
pub fn render_session<I>(
    engine: &mut TimelineEngine,
    renderer: &mut OverlayRenderer,
    frames: I,
    p1_label: &str,
    p2_label: &str,
) -> HudResult<Vec<image::RgbaImage>>
where
    I: IntoIterator<Item = image::RgbaImage>,
{
    engine.reset();
    let dt = engine.tick_duration();

    let mut out = Vec::new();
    for frame in frames {
        engine.tick(dt);
        let s = engine.get_state();
        renderer.set_health(crate::Player::One, s.p1.health_target, s.p1.health_display);
        renderer.set_health(crate::Player::Two, s.p2.health_target, s.p2.health_display);
        renderer.set_resource(crate::Player::One, s.p1.drive);
        renderer.set_resource(crate::Player::Two, s.p2.drive);
        out.push(renderer.render(Some(&frame), p1_label, p2_label, s.shake_offset)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Player;

    #[test]
    fn output_count_and_size_match_input() {
        let mut engine = TimelineEngine::new(60.0).unwrap();
        engine.add_event(0.02, Player::One, 20.0, false);
        let mut renderer = OverlayRenderer::new(320, 180).unwrap();

        let frames =
            (0..5).map(|_| image::RgbaImage::from_pixel(320, 180, image::Rgba([0, 0, 0, 255])));
        let rendered = render_session(&mut engine, &mut renderer, frames, "P1", "P2").unwrap();

        assert_eq!(rendered.len(), 5);
        assert!(rendered.iter().all(|f| f.dimensions() == (320, 180)));
        // The scripted hit landed during the batch.
        assert_eq!(engine.get_state().p2.health_target, 80.0);
    }

    #[test]
    fn restarts_from_time_zero() {
        let mut engine = TimelineEngine::new(60.0).unwrap();
        engine.add_event(0.02, Player::Two, 15.0, false);
        let mut renderer = OverlayRenderer::new(64, 64).unwrap();

        let make_frames =
            || (0..3).map(|_| image::RgbaImage::from_pixel(64, 64, image::Rgba([9, 9, 9, 255])));
        render_session(&mut engine, &mut renderer, make_frames(), "A", "B").unwrap();
        let first = engine.get_state().p1.health_target;
        render_session(&mut engine, &mut renderer, make_frames(), "A", "B").unwrap();
        let second = engine.get_state().p1.health_target;

        // The event re-applies on the second run instead of being skipped.
        assert_eq!(first, 85.0);
        assert_eq!(second, 85.0);
    }
}
