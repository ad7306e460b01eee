//! GPU side of the visualizer using wgpu.
//!
//! Two compute programs draw into an offscreen canvas every frame: a
//! background pass over the whole canvas, then one invocation per particle
//! reading the latest music record. A small render pass composites the
//! canvas onto whatever is being presented.

pub mod buffers;
pub mod context;
pub mod driver;
pub mod music;
pub mod particles;
pub mod pipelines;
pub mod plan;
pub mod present;
pub mod programs;
pub mod textures;

pub use buffers::FrameBuffers;
pub use context::{GpuContext, GpuError};
pub use driver::{DriverError, FrameDriver, FrameReport, RenderError};
pub use music::MusicMetrics;
pub use particles::{Particle, ParticleGrid};
pub use plan::{Dispatch, FramePlan, WorkgroupTile, PREFERRED_EXECUTION_WIDTH};
pub use present::{Compositor, PresentTarget, SurfaceFrame};
pub use programs::{ComputeProgram, ProgramError, ValidatedProgram};
pub use textures::{ReadbackBuffer, RenderTarget, CANVAS_FORMAT};
