//! Terrain height profile: generation on the host, sampling on both peers

use std::f64::consts::PI;

use rand::Rng;

use crate::net::protocol::FieldSize;

/// Baseline normalized height of the ground
const BASE_LEVEL: f64 = 0.3;
/// Amplitude of the full-width harmonic
const PRIMARY_AMPLITUDE: f64 = 0.1;
/// Amplitude of the half-width harmonic
const SECONDARY_AMPLITUDE: f64 = 0.05;
/// Upper bound of per-sample jitter
const JITTER: f64 = 0.05;

/// Generate `segments + 1` normalized heights: a base level, two sine
/// harmonics of decreasing amplitude and a small random jitter.
pub fn generate_profile<R: Rng>(rng: &mut R, segments: usize) -> Vec<f64> {
    let segments = segments.max(1);
    (0..=segments)
        .map(|i| {
            let x = i as f64 / segments as f64;
            let variation = (x * PI * 2.0).sin() * PRIMARY_AMPLITUDE
                + (x * PI * 4.0).sin() * SECONDARY_AMPLITUDE
                + rng.gen::<f64>() * JITTER;
            BASE_LEVEL + variation
        })
        .collect()
}

/// A sample on the terrain surface in world coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainPoint {
    pub x: f64,
    pub y: f64,
}

/// Immutable per-match surface. Sample x values run from 0 to the field
/// width in strictly increasing, evenly spaced steps.
#[derive(Debug, Clone)]
pub struct Terrain {
    points: Vec<TerrainPoint>,
    width: f64,
}

impl Terrain {
    /// Map a normalized profile onto the field. Height `h` lands at
    /// `y = field.height - h * field.height`.
    pub fn from_profile(profile: &[f64], field: FieldSize) -> Result<Self, TerrainError> {
        if profile.len() < 2 {
            return Err(TerrainError::TooFewSamples(profile.len()));
        }
        if let Some(index) = profile.iter().position(|h| !h.is_finite()) {
            return Err(TerrainError::NonFinite(index));
        }

        let last = (profile.len() - 1) as f64;
        let points = profile
            .iter()
            .enumerate()
            .map(|(i, h)| TerrainPoint {
                x: i as f64 / last * field.width,
                y: field.height - h * field.height,
            })
            .collect();

        Ok(Self {
            points,
            width: field.width,
        })
    }

    pub fn points(&self) -> &[TerrainPoint] {
        &self.points
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    /// Surface y at `x`, linearly interpolated. `x` outside the field clamps
    /// to the nearest endpoint.
    pub fn height_at(&self, x: f64) -> f64 {
        let x = x.clamp(0.0, self.width);
        let segments = self.points.len() - 1;
        let index = ((x / self.width) * segments as f64).floor() as usize;
        let index = index.min(segments - 1);

        let a = self.points[index];
        let b = self.points[index + 1];
        let t = (x - a.x) / (b.x - a.x);
        a.y + (b.y - a.y) * t
    }
}

/// Terrain construction errors
#[derive(Debug, thiserror::Error)]
pub enum TerrainError {
    #[error("Terrain profile needs at least 2 samples, got {0}")]
    TooFewSamples(usize),

    #[error("Terrain sample {0} is not a finite number")]
    NonFinite(usize),
}
