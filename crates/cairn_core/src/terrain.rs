//! Terrain height lookup.
//!
//! Terrain meshes are built elsewhere; the simulation only ever asks
//! "how high is the ground at `(x, z)`".

/// Read-only ground height provider.
pub trait TerrainHeight: Send + Sync {
    /// Ground height at world coordinates `(x, z)`.
    fn height_at(&self, x: f32, z: f32) -> f32;
}

impl<F> TerrainHeight for F
where
    F: Fn(f32, f32) -> f32 + Send + Sync,
{
    fn height_at(&self, x: f32, z: f32) -> f32 {
        self(x, z)
    }
}

/// Constant-height ground.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FlatTerrain {
    /// Ground height everywhere.
    pub height: f32,
}

impl FlatTerrain {
    /// Flat ground at `height`.
    #[must_use]
    pub const fn new(height: f32) -> Self {
        Self { height }
    }
}

impl TerrainHeight for FlatTerrain {
    fn height_at(&self, _x: f32, _z: f32) -> f32 {
        self.height
    }
}

/// Square heightmap centred on the origin, bilinearly sampled.
///
/// Lookups outside the grid clamp to the nearest edge sample.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightGrid {
    resolution: usize,
    size: f32,
    samples: Vec<f32>,
}

impl HeightGrid {
    /// Builds a grid from row-major samples (`z` rows of `x` columns).
    ///
    /// Returns `None` unless `samples.len() == resolution²` and
    /// `resolution >= 2`.
    #[must_use]
    pub fn from_samples(resolution: usize, size: f32, samples: Vec<f32>) -> Option<Self> {
        if resolution < 2 || samples.len() != resolution * resolution || size <= 0.0 {
            return None;
        }
        Some(Self {
            resolution,
            size,
            samples,
        })
    }

    /// Smooth deterministic hills that sink below `sea_level` toward the rim.
    #[must_use]
    pub fn rolling_hills(resolution: usize, size: f32, amplitude: f32, sea_level: f32) -> Self {
        let resolution = resolution.max(2);
        let half = size / 2.0;
        let step = size / (resolution - 1) as f32;
        let mut samples = Vec::with_capacity(resolution * resolution);
        for row in 0..resolution {
            let z = -half + row as f32 * step;
            for col in 0..resolution {
                let x = -half + col as f32 * step;
                let hills = (x * 0.05).sin() * (z * 0.07).cos() * amplitude;
                let radial = (x * x + z * z).sqrt() / half;
                let falloff = (1.0 - radial * radial).max(-0.5);
                samples.push(sea_level + 1.0 + hills * falloff.max(0.0) + falloff * 2.0);
            }
        }
        Self {
            resolution,
            size,
            samples,
        }
    }

    fn sample(&self, col: usize, row: usize) -> f32 {
        let col = col.min(self.resolution - 1);
        let row = row.min(self.resolution - 1);
        self.samples[row * self.resolution + col]
    }
}

impl TerrainHeight for HeightGrid {
    fn height_at(&self, x: f32, z: f32) -> f32 {
        let half = self.size / 2.0;
        let cells = (self.resolution - 1) as f32;
        let gx = ((x + half) / self.size * cells).clamp(0.0, cells);
        let gz = ((z + half) / self.size * cells).clamp(0.0, cells);

        let col = gx.floor() as usize;
        let row = gz.floor() as usize;
        let tx = gx - col as f32;
        let tz = gz - row as f32;

        let h00 = self.sample(col, row);
        let h10 = self.sample(col + 1, row);
        let h01 = self.sample(col, row + 1);
        let h11 = self.sample(col + 1, row + 1);

        let top = h00 + (h10 - h00) * tx;
        let bottom = h01 + (h11 - h01) * tx;
        top + (bottom - top) * tz
    }
}
