//! Side (team) classification from kit color
//!
//! A square patch around the entity centroid is converted to 8-bit HSV
//! (H 0..=180, S and V 0..=255) and each pixel is tested against two sets
//! of color bands: light/white for side A, red for side B. The side with
//! more matching pixels wins; ties go to side A.
//!
//! This is a coarse per-frame heuristic. Nothing is cached, so a label may
//! flip between frames.

use crate::domain::types::{Point, Side};
use crate::infra::config::Config;
use image::{imageops, Rgb, RgbImage};
use serde::Deserialize;

/// Maps an entity position in a frame to a side label
pub trait SideClassifier {
    fn classify(&self, frame: &RgbImage, centroid: Point) -> Side;
}

impl<F> SideClassifier for F
where
    F: Fn(&RgbImage, Point) -> Side,
{
    fn classify(&self, frame: &RgbImage, centroid: Point) -> Side {
        self(frame, centroid)
    }
}

/// Inclusive HSV range, written in config as `[h_lo, s_lo, v_lo, h_hi, s_hi, v_hi]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "[u8; 6]")]
pub struct HsvRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HsvRange {
    pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    #[inline]
    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|i| self.lower[i] <= hsv[i] && hsv[i] <= self.upper[i])
    }
}

impl From<[u8; 6]> for HsvRange {
    fn from(v: [u8; 6]) -> Self {
        Self::new([v[0], v[1], v[2]], [v[3], v[4], v[5]])
    }
}

/// Convert an RGB pixel to 8-bit HSV with hue halved into 0..=180
pub fn rgb_to_hsv(pixel: &Rgb<u8>) -> [u8; 3] {
    let [r, g, b] = pixel.0.map(f32::from);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let s = if max > 0.0 { delta * 255.0 / max } else { 0.0 };
    let mut h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    if h < 0.0 {
        h += 360.0;
    }

    [(h / 2.0).round() as u8, s.round() as u8, max as u8]
}

/// Pixel counts per band set for one patch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BandCounts {
    pub light: u32,
    pub red: u32,
}

impl BandCounts {
    /// Larger count wins, ties favor the light band
    pub fn side(&self) -> Side {
        if self.light >= self.red {
            Side::A
        } else {
            Side::B
        }
    }
}

/// Kit color classifier counting pixels in fixed HSV bands
#[derive(Debug, Clone)]
pub struct HsvBandClassifier {
    half_size: u32,
    light_bands: Vec<HsvRange>,
    red_bands: Vec<HsvRange>,
}

impl Default for HsvBandClassifier {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl HsvBandClassifier {
    pub fn new(half_size: u32, light_bands: Vec<HsvRange>, red_bands: Vec<HsvRange>) -> Self {
        Self { half_size, light_bands, red_bands }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.sample_half_size(),
            config.light_bands().to_vec(),
            config.red_bands().to_vec(),
        )
    }

    /// Count light and red pixels in a patch
    pub fn count_bands(&self, patch: &RgbImage) -> BandCounts {
        let mut counts = BandCounts::default();
        for pixel in patch.pixels() {
            let hsv = rgb_to_hsv(pixel);
            if self.light_bands.iter().any(|band| band.contains(hsv)) {
                counts.light += 1;
            }
            if self.red_bands.iter().any(|band| band.contains(hsv)) {
                counts.red += 1;
            }
        }
        counts
    }

    /// Classify an already-extracted patch
    pub fn classify_patch(&self, patch: &RgbImage) -> Side {
        self.count_bands(patch).side()
    }

    /// Cut the sampling square around `centroid`, clamped to the frame
    ///
    /// Returns `None` when nothing of the square lies inside the frame.
    pub fn sample_patch(&self, frame: &RgbImage, centroid: Point) -> Option<RgbImage> {
        let half = i64::from(self.half_size);
        let (w, h) = (i64::from(frame.width()), i64::from(frame.height()));
        let (cx, cy) = (i64::from(centroid.x), i64::from(centroid.y));

        let x0 = (cx - half).max(0);
        let x1 = (cx + half).min(w);
        let y0 = (cy - half).max(0);
        let y1 = (cy + half).min(h);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        // All four bounds lie within [0, dim] so the narrowing casts are lossless
        let view = imageops::crop_imm(
            frame,
            x0 as u32,
            y0 as u32,
            (x1 - x0) as u32,
            (y1 - y0) as u32,
        );
        Some(view.to_image())
    }
}

impl SideClassifier for HsvBandClassifier {
    fn classify(&self, frame: &RgbImage, centroid: Point) -> Side {
        match self.sample_patch(frame, centroid) {
            Some(patch) => self.classify_patch(&patch),
            None => BandCounts::default().side(),
        }
    }
}
