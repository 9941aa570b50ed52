use eframe::egui::Color32;
use palette::{IntoColor, LinSrgb, Mix, Srgb};

/// Fill for marks whose colour metric is absent.
pub const MISSING: Color32 = Color32::from_rgb(0xcc, 0xcc, 0xcc);

/// Fill for map regions without data.
pub const NO_DATA: Color32 = Color32::from_rgb(0xee, 0xee, 0xee);

const VIRIDIS: [u32; 10] = [
    0x440154, 0x482878, 0x3e4989, 0x31688e, 0x26828e, 0x1f9e89, 0x35b779, 0x6ece58, 0xb5de2b,
    0xfde725,
];

const RED_BLUE: [u32; 11] = [
    0x67001f, 0xb2182b, 0xd6604d, 0xf4a582, 0xfddbc7, 0xf7f7f7, 0xd1e5f0, 0x92c5de, 0x4393c3,
    0x2166ac, 0x053061,
];

fn linear(hex: u32) -> LinSrgb {
    let channel = |shift: u32| ((hex >> shift) & 0xff) as f32 / 255.0;
    Srgb::new(channel(16), channel(8), channel(0)).into_linear()
}

fn to_color32(c: LinSrgb) -> Color32 {
    let rgb: Srgb = c.into_color();
    Color32::from_rgb(
        (rgb.red.clamp(0.0, 1.0) * 255.0).round() as u8,
        (rgb.green.clamp(0.0, 1.0) * 255.0).round() as u8,
        (rgb.blue.clamp(0.0, 1.0) * 255.0).round() as u8,
    )
}

// ---------------------------------------------------------------------------
// Continuous colour scale: value → Color32
// ---------------------------------------------------------------------------

/// Piecewise interpolation between colour stops over a numeric domain.
/// Stops are mixed in linear sRGB.
#[derive(Debug, Clone)]
pub struct ColorScale {
    stops: Vec<LinSrgb>,
    domain: (f64, f64),
}

impl ColorScale {
    fn from_hex(stops: &[u32], domain: (f64, f64)) -> Self {
        Self {
            stops: stops.iter().map(|h| linear(*h)).collect(),
            domain,
        }
    }

    /// Sequential dark-purple → yellow scale.
    pub fn viridis(domain: (f64, f64)) -> Self {
        Self::from_hex(&VIRIDIS, domain)
    }

    /// Diverging scale: `domain.0` maps to dark red, `domain.1` to dark blue.
    pub fn red_blue(domain: (f64, f64)) -> Self {
        Self::from_hex(&RED_BLUE, domain)
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    /// Colour at `t` in `[0, 1]` along the stops.
    pub fn at(&self, t: f64) -> Color32 {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.5 };
        let last = self.stops.len().saturating_sub(1);
        if last == 0 {
            return self.stops.first().copied().map_or(MISSING, to_color32);
        }
        let pos = t * last as f64;
        let i = (pos.floor() as usize).min(last - 1);
        let frac = (pos - i as f64) as f32;
        to_color32(self.stops[i].mix(self.stops[i + 1], frac))
    }

    /// Colour for a value; values outside the domain are clamped.
    pub fn color_for(&self, value: f64) -> Color32 {
        let (lo, hi) = self.domain;
        let span = hi - lo;
        if span == 0.0 {
            return self.at(0.5);
        }
        self.at((value - lo) / span)
    }

    /// Colour for an optional value, grey when absent.
    pub fn color_or_missing(&self, value: Option<f64>) -> Color32 {
        value.map_or(MISSING, |v| self.color_for(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_hit_first_and_last_stop() {
        let s = ColorScale::viridis((0.0, 1.0));
        assert_eq!(s.color_for(0.0), Color32::from_rgb(0x44, 0x01, 0x54));
        assert_eq!(s.color_for(1.0), Color32::from_rgb(0xfd, 0xe7, 0x25));
        // Clamped outside the domain.
        assert_eq!(s.color_for(-3.0), s.color_for(0.0));
        assert_eq!(s.color_for(7.0), s.color_for(1.0));
    }

    #[test]
    fn diverging_middle_is_near_white() {
        let s = ColorScale::red_blue((1.0, -1.0));
        let mid = s.color_for(0.0);
        assert!(mid.r() > 240 && mid.g() > 240 && mid.b() > 240);
        assert!(s.color_for(1.0).r() > s.color_for(1.0).b());
        assert!(s.color_for(-1.0).b() > s.color_for(-1.0).r());
    }

    #[test]
    fn degenerate_domain_and_missing_values() {
        let s = ColorScale::viridis((3.0, 3.0));
        assert_eq!(s.color_for(3.0), s.at(0.5));
        assert_eq!(s.color_or_missing(None), MISSING);
    }
}
