use crate::error::{HudError, HudResult};

pub type PremulRgba8 = [u8; 4];

/// Alpha-over of one premultiplied pixel onto another.
pub fn over(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    let sa = u16::from(src[3]);
    if sa == 0 {
        return dst;
    }
    let inv = 255u16 - sa;

    let mut out = [0u8; 4];
    out[3] = add_sat_u8(src[3], mul_div255(u16::from(dst[3]), inv));
    for i in 0..3 {
        out[i] = add_sat_u8(src[i], mul_div255(u16::from(dst[i]), inv));
    }
    out
}

/// Composite a premultiplied RGBA8 layer over `dst` in place.
pub fn over_in_place(dst: &mut [u8], src: &[u8]) -> HudResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(HudError::invalid_configuration(
            "over_in_place expects equal-length rgba8 buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]]);
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// Straight-alpha RGBA8 to premultiplied, in place.
pub fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((u16::from(px[0]) * a + 127) / 255) as u8;
        px[1] = ((u16::from(px[1]) * a + 127) / 255) as u8;
        px[2] = ((u16::from(px[2]) * a + 127) / 255) as u8;
    }
}

/// Premultiplied RGBA8 back to straight alpha, in place.
pub fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u32::from(px[3]);
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        for c in 0..3 {
            px[c] = ((u32::from(px[c]) * 255 + a / 2) / a).min(255) as u8;
        }
    }
}

/// Copy a straight-alpha source image into a canvas-sized buffer at (0,0).
///
/// Overflow is cropped and short dimensions leave transparent padding: the
/// configured canvas drives the output size, not the input frame.
pub fn blit_into_canvas(src: &image::RgbaImage, width: u32, height: u32) -> Vec<u8> {
    let mut out = vec![0u8; (width as usize) * (height as usize) * 4];
    let copy_w = (src.width().min(width) as usize) * 4;
    let copy_h = src.height().min(height) as usize;
    let src_stride = (src.width() as usize) * 4;
    let dst_stride = (width as usize) * 4;
    let src_bytes = src.as_raw();
    for row in 0..copy_h {
        let s = row * src_stride;
        let d = row * dst_stride;
        out[d..d + copy_w].copy_from_slice(&src_bytes[s..s + copy_w]);
    }
    out
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

fn add_sat_u8(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}
