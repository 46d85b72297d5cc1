//! Porter-Duff operators and separable blend modes on straight-alpha RGBA8
//!
//! Formulas follow the W3C Compositing and Blending Level 1 definitions:
//!
//! ```text
//! Cs' = (1 - ab) * Cs + ab * B(Cb, Cs)
//! ao  = as + ab * (1 - as)
//! co  = as * Cs' + ab * (1 - as) * Cb        (premultiplied)
//! ```
//!
//! `as` already includes the global alpha of the draw.

pub type Rgba8 = [u8; 4];

/// How a source pixel is combined with the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    /// Normal alpha compositing
    #[default]
    SourceOver,
    /// Keep the destination where the source is opaque: `ao = ab * as`
    DestinationIn,
    /// Soft light blend, then source-over
    SoftLight,
    /// Overlay blend (hard light with layers swapped), then source-over
    Overlay,
    /// Additive: premultiplied colours and alphas are summed and clamped
    Lighter,
}

impl BlendMode {
    pub fn composite(self, dst: Rgba8, src: Rgba8, alpha: f32) -> Rgba8 {
        let sa = unit(src[3]) * alpha.clamp(0.0, 1.0);
        let da = unit(dst[3]);

        match self {
            BlendMode::DestinationIn => [dst[0], dst[1], dst[2], to_u8(da * sa)],
            BlendMode::Lighter => {
                if sa <= 0.0 {
                    return dst;
                }
                let ao = (sa + da).min(1.0);
                let mut out = [0u8; 4];
                for i in 0..3 {
                    let co = (unit(src[i]) * sa + unit(dst[i]) * da).min(ao);
                    out[i] = to_u8(co / ao);
                }
                out[3] = to_u8(ao);
                out
            }
            BlendMode::SourceOver | BlendMode::SoftLight | BlendMode::Overlay => {
                if sa <= 0.0 {
                    return dst;
                }
                if self == BlendMode::SourceOver && sa >= 1.0 {
                    return [src[0], src[1], src[2], 255];
                }
                let ao = sa + da * (1.0 - sa);
                let mut out = [0u8; 4];
                for i in 0..3 {
                    let cs = unit(src[i]);
                    let cb = unit(dst[i]);
                    let mixed = (1.0 - da) * cs + da * self.blend_channel(cb, cs);
                    let co = sa * mixed + da * (1.0 - sa) * cb;
                    out[i] = to_u8(co / ao);
                }
                out[3] = to_u8(ao);
                out
            }
        }
    }

    /// The separable mixing function `B(Cb, Cs)`
    fn blend_channel(self, cb: f32, cs: f32) -> f32 {
        match self {
            BlendMode::SoftLight => soft_light(cb, cs),
            BlendMode::Overlay => hard_light(cs, cb),
            _ => cs,
        }
    }
}

fn soft_light(cb: f32, cs: f32) -> f32 {
    if cs <= 0.5 {
        cb - (1.0 - 2.0 * cs) * cb * (1.0 - cb)
    } else {
        let d = if cb <= 0.25 {
            ((16.0 * cb - 12.0) * cb + 4.0) * cb
        } else {
            cb.sqrt()
        };
        cb + (2.0 * cs - 1.0) * (d - cb)
    }
}

// B_hardlight(Cb, Cs); overlay is hard_light(Cs, Cb) with the layers swapped
fn hard_light(cb: f32, cs: f32) -> f32 {
    if cs <= 0.5 {
        cb * 2.0 * cs
    } else {
        let s = 2.0 * cs - 1.0;
        cb + s - cb * s
    }
}

/// Straight-alpha linear mix of two pixels
pub(crate) fn mix(a: Rgba8, b: Rgba8, t: f32) -> Rgba8 {
    if t <= 0.0 {
        return a;
    }
    if t >= 1.0 {
        return b;
    }
    let mut out = [0u8; 4];
    for i in 0..4 {
        let v = f32::from(a[i]) + (f32::from(b[i]) - f32::from(a[i])) * t;
        out[i] = v.round().clamp(0.0, 255.0) as u8;
    }
    out
}

pub(crate) fn unit(v: u8) -> f32 {
    f32::from(v) / 255.0
}

pub(crate) fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}
