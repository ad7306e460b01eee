//! Particle records and the fixed lattice they start on.

/// One particle as laid out in the GPU storage buffer.
///
/// WGSL: `struct Particle { position: vec2<f32>, meta: vec2<f32> }`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Particle {
    pub position: [f32; 2],
    /// `[cycle counter, stable index]`. The host writes the counter as 0; the
    /// particle shader advances it.
    pub meta: [f32; 2],
}

/// Regular lattice the particles are created on, in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleGrid {
    pub columns: u32,
    pub rows: u32,
    pub origin: f32,
    pub stride: f32,
}

impl Default for ParticleGrid {
    fn default() -> Self {
        Self {
            columns: 60,
            rows: 60,
            origin: 8.0,
            stride: 20.0,
        }
    }
}

impl ParticleGrid {
    pub fn len(&self) -> usize {
        self.columns as usize * self.rows as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Edge length of the square the lattice cells tile.
    pub fn extent(&self) -> f32 {
        self.columns.max(self.rows) as f32 * self.stride
    }

    /// Build the particles in row-major order.
    pub fn build(&self) -> Vec<Particle> {
        let mut particles = Vec::with_capacity(self.len());
        for row in 0..self.rows {
            for col in 0..self.columns {
                let index = row * self.columns + col;
                particles.push(Particle {
                    position: [
                        self.origin + col as f32 * self.stride,
                        self.origin + row as f32 * self.stride,
                    ],
                    meta: [0.0, index as f32],
                });
            }
        }
        particles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_particle_layout_matches_wgsl() {
        assert_eq!(std::mem::size_of::<Particle>(), 16);
        assert_eq!(std::mem::align_of::<Particle>(), 4);
    }

    #[test]
    fn test_small_grid() {
        let grid = ParticleGrid {
            columns: 3,
            rows: 2,
            origin: 1.0,
            stride: 10.0,
        };
        let particles = grid.build();
        assert_eq!(particles.len(), 6);
        assert_eq!(particles[4].position, [11.0, 11.0]);
        assert_eq!(particles[4].meta, [0.0, 4.0]);
    }

    #[test]
    fn test_empty_grid() {
        let grid = ParticleGrid {
            columns: 0,
            ..Default::default()
        };
        assert!(grid.is_empty());
        assert!(grid.build().is_empty());
    }

    #[test]
    fn test_default_extent_fills_canvas() {
        // Last particle sits at 8 + 59 * 20 = 1188, inside the 1200 px cell.
        assert_eq!(ParticleGrid::default().extent(), 1200.0);
    }
}
