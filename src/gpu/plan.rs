//! Dispatch geometry for the two compute passes of a frame.

use super::programs::ComputeProgram;

/// Execution width asked for before clamping to device limits. Matches the
/// SIMD width of most desktop GPUs.
pub const PREFERRED_EXECUTION_WIDTH: u32 = 32;

/// 2D workgroup shape chosen from the device's compute limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkgroupTile {
    pub width: u32,
    pub height: u32,
}

impl WorkgroupTile {
    pub fn from_limits(limits: &wgpu::Limits) -> Self {
        Self::fit(
            PREFERRED_EXECUTION_WIDTH,
            limits.max_compute_invocations_per_workgroup,
            limits.max_compute_workgroup_size_x,
            limits.max_compute_workgroup_size_y,
        )
    }

    /// Widest tile no wider than `preferred` whose area fits `max_invocations`.
    pub fn fit(preferred: u32, max_invocations: u32, max_x: u32, max_y: u32) -> Self {
        let width = preferred.min(max_x).min(max_invocations).max(1);
        let height = (max_invocations / width).min(max_y).max(1);
        Self { width, height }
    }

    pub fn invocations(&self) -> u32 {
        self.width * self.height
    }

    /// Invocations per workgroup for one-dimensional passes.
    pub fn linear(&self, max_x: u32) -> u32 {
        self.invocations().min(max_x).max(1)
    }
}

/// One compute dispatch: which program, over how many work items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatch {
    pub program: ComputeProgram,
    /// Work items per axis.
    pub grid: [u32; 3],
    /// Workgroup size per axis.
    pub workgroup: [u32; 3],
}

impl Dispatch {
    /// Number of workgroups to launch so every work item is covered.
    pub fn workgroups(&self) -> [u32; 3] {
        [
            self.grid[0].div_ceil(self.workgroup[0]),
            self.grid[1].div_ceil(self.workgroup[1]),
            self.grid[2].div_ceil(self.workgroup[2]),
        ]
    }
}

/// The fixed sequence of dispatches issued every frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePlan {
    background: Dispatch,
    particles: Dispatch,
}

impl FramePlan {
    pub fn new(background_grid: u32, particle_count: u32, tile: WorkgroupTile, max_x: u32) -> Self {
        Self {
            background: Dispatch {
                program: ComputeProgram::Background,
                grid: [background_grid, background_grid, 1],
                workgroup: [tile.width, tile.height, 1],
            },
            particles: Dispatch {
                program: ComputeProgram::Particles,
                grid: [particle_count, 1, 1],
                workgroup: [tile.linear(max_x), 1, 1],
            },
        }
    }

    pub fn background(&self) -> &Dispatch {
        &self.background
    }

    pub fn particles(&self) -> &Dispatch {
        &self.particles
    }

    /// Dispatches in submission order.
    pub fn dispatches(&self) -> [Dispatch; 2] {
        [self.background, self.particles]
    }
}
