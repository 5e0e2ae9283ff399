use palette::{FromColor, Hsl, LinSrgba, Srgb, Srgba};

use crate::scene::ColorLinPremul;

// sRGB / HSL → linear premultiplied conversions.
impl ColorLinPremul {
    /// Convenience alias matching Color::rgba(...) widely used in drawing code.
    #[inline]
    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::from_srgba_u8([r, g, b, a])
    }

    /// Create from sRGB u8 RGBA array (premultiplied in linear space).
    #[inline]
    pub fn from_srgba_u8(c: [u8; 4]) -> Self {
        let s = Srgba::new(
            c[0] as f32 / 255.0,
            c[1] as f32 / 255.0,
            c[2] as f32 / 255.0,
            c[3] as f32 / 255.0,
        );
        let lin: LinSrgba = LinSrgba::from_color(s);
        Self {
            r: lin.red * lin.alpha,
            g: lin.green * lin.alpha,
            b: lin.blue * lin.alpha,
            a: lin.alpha,
        }
    }

    /// Create from an opaque HSL color: hue in degrees, saturation and lightness in percent.
    #[inline]
    pub fn from_hsl(hue: f32, saturation: f32, lightness: f32) -> Self {
        let hsl: Hsl = Hsl::new(hue, saturation / 100.0, lightness / 100.0);
        let srgb: Srgb = Srgb::from_color(hsl);
        let lin: LinSrgba = LinSrgba::from_color(Srgba::new(srgb.red, srgb.green, srgb.blue, 1.0));
        Self {
            r: lin.red,
            g: lin.green,
            b: lin.blue,
            a: 1.0,
        }
    }

    /// Create directly from linear RGBA floats and premultiply.
    #[inline]
    pub fn from_lin_rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self {
            r: r * a,
            g: g * a,
            b: b * a,
            a,
        }
    }

    /// Linear RGB components with alpha removed, as handed to shader uniforms.
    #[inline]
    pub fn to_rgb(&self) -> [f32; 3] {
        if self.a > 0.0001 {
            [self.r / self.a, self.g / self.a, self.b / self.a]
        } else {
            [0.0, 0.0, 0.0]
        }
    }

    #[inline]
    pub fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Convert back to sRGB u8 RGBA array (unpremultiplied).
    #[inline]
    pub fn to_srgba_u8(&self) -> [u8; 4] {
        let [r, g, b] = self.to_rgb();

        // Convert linear to sRGB
        let lin = LinSrgba::new(r, g, b, self.a);
        let srgb: Srgba = Srgba::from_color(lin);

        [
            (srgb.red * 255.0).round().clamp(0.0, 255.0) as u8,
            (srgb.green * 255.0).round().clamp(0.0, 255.0) as u8,
            (srgb.blue * 255.0).round().clamp(0.0, 255.0) as u8,
            (srgb.alpha * 255.0).round().clamp(0.0, 255.0) as u8,
        ]
    }
}

/// Component-wise HSL interpolation (hue in degrees, saturation/lightness in percent).
/// Hue is interpolated numerically, not along the shortest arc.
pub fn lerp_hsl(from: [f32; 3], to: [f32; 3], t: f32) -> ColorLinPremul {
    let t = t.clamp(0.0, 1.0);
    let mix = |a: f32, b: f32| a + (b - a) * t;
    ColorLinPremul::from_hsl(mix(from[0], to[0]), mix(from[1], to[1]), mix(from[2], to[2]))
}
