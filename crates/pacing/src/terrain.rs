//! Perlin noise terrain for procedurally generated courses.

use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

/// Parameters of a noise-based elevation profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainParams {
    /// Noise seed; the same seed always yields the same terrain.
    pub seed: u32,
    /// Elevation around which the terrain varies, in meters.
    pub base_elevation: f64,
    /// Amplitude of the variation in meters.
    pub height_scale: f64,
    /// Spatial frequency in cycles per meter (controls hill "wavelength").
    pub frequency: f64,
    /// Number of noise octaves for detail.
    pub octaves: u32,
}

impl TerrainParams {
    /// Gentle rolling hills: ±15 m over roughly kilometre-long undulations.
    pub fn rolling(seed: u32) -> Self {
        Self {
            seed,
            base_elevation: 300.0,
            height_scale: 15.0,
            frequency: 0.001,
            octaves: 3,
        }
    }

    /// Punchy terrain with short steep ramps.
    pub fn hilly(seed: u32) -> Self {
        Self {
            seed,
            base_elevation: 600.0,
            height_scale: 40.0,
            frequency: 0.002,
            octaves: 4,
        }
    }
}

/// Samples elevation along a course from multi-octave Perlin noise.
#[derive(Debug, Clone)]
pub struct TerrainGenerator {
    perlin: Perlin,
    params: TerrainParams,
}

impl TerrainGenerator {
    pub fn new(params: TerrainParams) -> Self {
        Self {
            perlin: Perlin::new(params.seed),
            params,
        }
    }

    /// Elevation at a distance along the course.
    ///
    /// Uses fractal Brownian motion for a natural appearance.
    pub fn elevation_at(&self, distance: f64) -> f64 {
        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = self.params.frequency;
        let mut max_amplitude = 0.0;

        for _ in 0..self.params.octaves.max(1) {
            // Off-lattice second coordinate; Perlin noise is zero on integer lattice points.
            total += self.perlin.get([distance * frequency, 0.5]) * amplitude;
            max_amplitude += amplitude;
            amplitude *= 0.5;
            frequency *= 2.0;
        }

        let normalized = total / max_amplitude;
        self.params.base_elevation + normalized * self.params.height_scale
    }

    /// Samples `(distance, elevation)` points every `spacing` meters from 0 to `length`.
    ///
    /// The final point always lands exactly on `length`.
    pub fn profile(&self, length: f64, spacing: f64) -> Vec<(f64, f64)> {
        let mut profile: Vec<(f64, f64)> = (0..)
            .map(|i| i as f64 * spacing)
            .take_while(|distance| *distance < length)
            .map(|distance| (distance, self.elevation_at(distance)))
            .collect();
        profile.push((length, self.elevation_at(length)));
        profile
    }
}
