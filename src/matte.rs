// ── Keyed-colour matting ──────────────────────────────────────────────────────
//
// Turns background pixels transparent while leaving every other pixel
// untouched. Two predicates are supported:
// - distance: channel-sum distance to a reference colour below a threshold;
// - neutral: all channels past a white/black threshold with a bounded chroma
//   spread, so saturated colours are never treated as background.
// Pixels that are already fully transparent are skipped.

use image::{DynamicImage, Rgb, Rgba, RgbaImage};

use crate::error::{Error, Result};

/// Alpha-0 white, written when `clear_rgb` is set.
const CLEARED: Rgba<u8> = Rgba([255, 255, 255, 0]);

/// Neutral background tone removed in `MatteMode::Neutral`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Background {
    #[default]
    White,
    Black,
}

/// Where the distance-mode reference colour comes from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Reference {
    /// Read the RGB of the pixel at `(x, y)` of the image being matted.
    Sample { x: u32, y: u32 },
    /// A fixed colour.
    Fixed(Rgb<u8>),
}

impl Default for Reference {
    fn default() -> Self {
        Reference::Sample { x: 0, y: 0 }
    }
}

/// The match predicate.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MatteMode {
    Distance { reference: Reference, threshold: u32 },
    Neutral { background: Background, threshold: u8, chroma_threshold: u8 },
}

/// A configured matte: predicate plus what to write into matched pixels.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Matte {
    pub mode: MatteMode,
    /// Reset matched pixels to white as well as clearing alpha.
    pub clear_rgb: bool,
}

impl Matte {
    /// Distance matte sampling the top-left pixel; matched pixels become
    /// transparent white.
    pub fn distance(threshold: u32) -> Self {
        Self {
            mode: MatteMode::Distance { reference: Reference::default(), threshold },
            clear_rgb: true,
        }
    }

    /// Threshold+chroma matte; matched pixels keep their RGB.
    pub fn neutral(background: Background, threshold: u8, chroma_threshold: u8) -> Self {
        Self {
            mode: MatteMode::Neutral { background, threshold, chroma_threshold },
            clear_rgb: false,
        }
    }

    /// Replace the distance-mode reference. No effect on neutral mattes.
    pub fn with_reference(mut self, reference: Reference) -> Self {
        if let MatteMode::Distance { threshold, .. } = self.mode {
            self.mode = MatteMode::Distance { reference, threshold };
        }
        self
    }

    /// Resolve a sampled reference against `img`, yielding a matte with a
    /// fixed key colour. Re-applying the resolved matte is a no-op.
    pub fn resolve(&self, img: &RgbaImage) -> Result<Matte> {
        match self.mode {
            MatteMode::Distance { reference: Reference::Sample { x, y }, threshold } => {
                let (width, height) = img.dimensions();
                if x >= width || y >= height {
                    return Err(Error::SampleOutOfBounds { x, y, width, height });
                }
                let [r, g, b, _] = img.get_pixel(x, y).0;
                Ok(Matte {
                    mode: MatteMode::Distance {
                        reference: Reference::Fixed(Rgb([r, g, b])),
                        threshold,
                    },
                    clear_rgb: self.clear_rgb,
                })
            }
            _ => Ok(*self),
        }
    }

    /// Matte `img` in place. Returns the number of pixels keyed out.
    pub fn apply(&self, img: &mut RgbaImage) -> Result<usize> {
        let resolved = self.resolve(img)?;
        let mut keyed = 0;
        for px in img.pixels_mut() {
            if px[3] == 0 || !resolved.matches(*px) {
                continue;
            }
            *px = if resolved.clear_rgb { CLEARED } else { Rgba([px[0], px[1], px[2], 0]) };
            keyed += 1;
        }
        Ok(keyed)
    }

    /// Promote any colour type to RGBA and matte it.
    pub fn apply_to_dynamic(&self, img: DynamicImage) -> Result<RgbaImage> {
        let mut rgba = img.into_rgba8();
        self.apply(&mut rgba)?;
        Ok(rgba)
    }

    /// Whether `px` is background under this matte. A sampled reference that
    /// has not been resolved never matches.
    pub fn matches(&self, px: Rgba<u8>) -> bool {
        let [r, g, b, _] = px.0;
        match self.mode {
            MatteMode::Distance { reference: Reference::Fixed(key), threshold } => {
                channel_distance([r, g, b], key.0) < threshold
            }
            MatteMode::Distance { reference: Reference::Sample { .. }, .. } => false,
            MatteMode::Neutral { background, threshold, chroma_threshold } => {
                let max_c = r.max(g).max(b);
                let min_c = r.min(g).min(b);
                let neutral = max_c - min_c <= chroma_threshold;
                let past = match background {
                    Background::White => min_c >= threshold,
                    Background::Black => max_c <= threshold,
                };
                neutral && past
            }
        }
    }
}

/// Sum of absolute per-channel differences.
#[inline]
pub fn channel_distance(a: [u8; 3], b: [u8; 3]) -> u32 {
    a.iter().zip(b.iter()).map(|(&x, &y)| x.abs_diff(y) as u32).sum()
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_channel_sum() {
        assert_eq!(channel_distance([250, 250, 250], [255, 255, 255]), 15);
        assert_eq!(channel_distance([200, 200, 200], [255, 255, 255]), 165);
        assert_eq!(channel_distance([0, 255, 10], [10, 245, 0]), 30);
    }

    #[test]
    fn neutral_white_rejects_saturated_colours() {
        let m = Matte::neutral(Background::White, 245, 10);
        assert!(m.matches(Rgba([250, 248, 246, 255])));
        assert!(!m.matches(Rgba([255, 245, 230, 255])));
        assert!(!m.matches(Rgba([244, 250, 250, 255])));
    }

    #[test]
    fn neutral_black_bounds() {
        let m = Matte::neutral(Background::Black, 12, 10);
        assert!(m.matches(Rgba([0, 0, 0, 255])));
        assert!(m.matches(Rgba([12, 5, 3, 255])));
        assert!(!m.matches(Rgba([13, 5, 5, 255])));
    }

    #[test]
    fn unresolved_sample_never_matches() {
        assert!(!Matte::distance(30).matches(Rgba([0, 0, 0, 255])));
    }

    #[test]
    fn sample_out_of_bounds_is_an_error() {
        let img = RgbaImage::new(4, 4);
        let m = Matte::distance(30).with_reference(Reference::Sample { x: 4, y: 0 });
        assert!(matches!(m.resolve(&img), Err(Error::SampleOutOfBounds { x: 4, .. })));
    }
}
