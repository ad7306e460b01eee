//! Per-frame orchestration: background pass, music upload, particle pass,
//! composite, present.

use std::sync::Arc;
use wgpu::{BindGroup, Device, Queue, TextureFormat};

use crate::audio::{AudioMetricsSource, PowerMeter};
use crate::config::VisualizerConfig;

use super::buffers::FrameBuffers;
use super::context::{GpuContext, GpuError};
use super::music::MusicMetrics;
use super::particles::{Particle, ParticleGrid};
use super::pipelines::{FrameLayouts, FramePipelines};
use super::plan::{Dispatch, FramePlan, WorkgroupTile};
use super::present::{acquire, Compositor, PresentTarget};
use super::programs::{self, ComputeProgram, ProgramError};
use super::textures::{ReadbackBuffer, RenderTarget};

/// Fatal errors while building a [`FrameDriver`].
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error(transparent)]
    Gpu(#[from] GpuError),
    #[error(transparent)]
    Program(#[from] ProgramError),
    #[error("particle grid is empty")]
    EmptyGrid,
    #[error("{count} particles exceed the dispatch limit of {limit}")]
    TooManyParticles { count: usize, limit: u64 },
    #[error("particle lattice spans {extent} px but the canvas is only {canvas} px")]
    CanvasTooSmall { extent: f32, canvas: u32 },
    #[error("{canvas} px canvas exceeds the device texture limit of {limit} px")]
    CanvasTooLarge { canvas: u32, limit: u32 },
}

/// Errors for a single frame. The caller decides whether to keep going.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to acquire surface texture: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error("frame rejected by the GPU: {0}")]
    Gpu(String),
}

/// What one call to [`FrameDriver::render`] did.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    /// Zero-based count of frames rendered before this one.
    pub frame_index: u64,
    /// Dispatches in the order they were recorded.
    pub dispatches: Vec<Dispatch>,
    /// Music record uploaded before the particle pass.
    pub music: MusicMetrics,
}

/// Owns the particle and music data, their GPU buffers, and the pipelines
/// that draw them.
pub struct FrameDriver<M> {
    device: Arc<Device>,
    queue: Arc<Queue>,
    source: AudioMetricsSource<M>,
    intensity_flag: f32,
    particles: Vec<Particle>,
    music: MusicMetrics,
    buffers: FrameBuffers,
    canvas: RenderTarget,
    plan: FramePlan,
    pipelines: FramePipelines,
    background_bind_group: BindGroup,
    particles_bind_group: BindGroup,
    compositor: Compositor,
    frame_index: u64,
}

impl<M: PowerMeter> FrameDriver<M> {
    /// Build a driver for the default 60 × 60 particle lattice.
    pub fn new(
        ctx: &GpuContext,
        config: &VisualizerConfig,
        source: AudioMetricsSource<M>,
        target_format: TextureFormat,
    ) -> Result<Self, DriverError> {
        Self::with_grid(ctx, config, source, target_format, ParticleGrid::default())
    }

    pub fn with_grid(
        ctx: &GpuContext,
        config: &VisualizerConfig,
        mut source: AudioMetricsSource<M>,
        target_format: TextureFormat,
        grid: ParticleGrid,
    ) -> Result<Self, DriverError> {
        let device = Arc::clone(&ctx.device);
        let queue = Arc::clone(&ctx.queue);
        let limits = device.limits();

        let background_grid = config.background_grid();
        check_canvas(&grid, background_grid, limits.max_texture_dimension_2d)?;

        let tile = WorkgroupTile::from_limits(&limits);
        let linear_group = tile.linear(limits.max_compute_workgroup_size_x);
        let background_program = programs::prepare(ComputeProgram::Background, tile, linear_group)?;
        let particles_program = programs::prepare(ComputeProgram::Particles, tile, linear_group)?;
        let layouts = FrameLayouts::new(&device);
        let pipelines =
            FramePipelines::new(&device, &layouts, &background_program, &particles_program);
        log::info!(
            "Compiled compute programs (tile {}x{}, linear group {})",
            tile.width,
            tile.height,
            linear_group
        );

        let particles = grid.build();
        let max_groups = limits.max_compute_workgroups_per_dimension as u64;
        if particles.len() as u64 > max_groups * linear_group as u64 {
            return Err(DriverError::TooManyParticles {
                count: particles.len(),
                limit: max_groups * linear_group as u64,
            });
        }

        let intensity_flag = config.intensity_flag();
        let music = MusicMetrics::sample(&mut source, intensity_flag);
        let buffers = FrameBuffers::new(&device, &particles, &music);
        log::info!("Uploaded {} particles", buffers.particle_count());

        let canvas = RenderTarget::canvas(&device, background_grid);
        let plan = FramePlan::new(
            background_grid,
            buffers.particle_count(),
            tile,
            limits.max_compute_workgroup_size_x,
        );

        let background_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("background_bind_group"),
            layout: &layouts.background,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(canvas.view()),
            }],
        });

        let particles_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("particles_bind_group"),
            layout: &layouts.particles,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(canvas.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: buffers.particles.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: buffers.music.as_entire_binding(),
                },
            ],
        });

        let compositor = Compositor::new(&device, canvas.view(), target_format);

        Ok(Self {
            device,
            queue,
            source,
            intensity_flag,
            particles,
            music,
            buffers,
            canvas,
            plan,
            pipelines,
            background_bind_group,
            particles_bind_group,
            compositor,
            frame_index: 0,
        })
    }

    /// Draw one frame into `target` and present it.
    ///
    /// GPU validation and out-of-memory errors raised while recording or
    /// submitting the frame come back as [`RenderError::Gpu`]; the target is
    /// then dropped without being presented.
    pub fn render<T: PresentTarget>(&mut self, target: T) -> Result<FrameReport, RenderError> {
        // Scopes pop in reverse push order.
        let oom_scope = self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let validation_scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });
        let mut dispatches = Vec::with_capacity(2);

        self.encode_dispatch(
            &mut encoder,
            self.plan.background(),
            &self.background_bind_group,
            &mut dispatches,
        );

        // The queued write lands before the command buffer executes, so the
        // particle pass below sees this frame's sample.
        self.music = MusicMetrics::sample(&mut self.source, self.intensity_flag);
        self.buffers.write_music(&self.queue, &self.music);

        self.encode_dispatch(
            &mut encoder,
            self.plan.particles(),
            &self.particles_bind_group,
            &mut dispatches,
        );

        self.compositor.encode(&mut encoder, target.view());
        self.queue.submit(std::iter::once(encoder.finish()));

        let validation = pollster::block_on(validation_scope.pop());
        let oom = pollster::block_on(oom_scope.pop());
        if let Some(error) = validation.or(oom) {
            log::debug!("Frame {} rejected: {}", self.frame_index, error);
            return Err(RenderError::Gpu(error.to_string()));
        }

        target.present();

        log::debug!(
            "Frame {}: average {:.1} dB, peak {:.1} dB",
            self.frame_index,
            self.music.average_db(),
            self.music.peak_db()
        );

        let report = FrameReport {
            frame_index: self.frame_index,
            dispatches,
            music: self.music,
        };
        self.frame_index += 1;
        Ok(report)
    }

    /// Acquire the next texture of `surface` and render into it.
    pub fn render_to_surface(
        &mut self,
        surface: &wgpu::Surface<'_>,
    ) -> Result<FrameReport, RenderError> {
        let frame = acquire(surface)?;
        self.render(frame)
    }

    fn encode_dispatch(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        dispatch: &Dispatch,
        bind_group: &BindGroup,
        recorded: &mut Vec<Dispatch>,
    ) {
        let [x, y, z] = dispatch.workgroups();
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(dispatch.program.label()),
            timestamp_writes: None,
        });
        pass.set_pipeline(self.pipelines.for_program(dispatch.program));
        pass.set_bind_group(0, bind_group, &[]);
        pass.dispatch_workgroups(x, y, z);
        recorded.push(*dispatch);
    }

    /// Host copy of the particles as first uploaded.
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Most recent music record.
    pub fn music(&self) -> &MusicMetrics {
        &self.music
    }

    pub fn plan(&self) -> &FramePlan {
        &self.plan
    }

    pub fn canvas(&self) -> &RenderTarget {
        &self.canvas
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frame_index
    }

    pub fn source(&self) -> &AudioMetricsSource<M> {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut AudioMetricsSource<M> {
        &mut self.source
    }

    /// Copy the canvas back to the CPU as tightly packed RGBA8 rows.
    pub fn read_canvas(&self) -> Result<Vec<u8>, GpuError> {
        let readback = ReadbackBuffer::new(&self.device, self.canvas.width(), self.canvas.height());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("canvas_readback_encoder"),
            });
        readback.encode_copy(&mut encoder, self.canvas.texture());
        self.queue.submit(std::iter::once(encoder.finish()));
        readback.read_pixels(&self.device)
    }

    /// Copy the GPU particle buffer back, including the advanced counters.
    pub fn read_particles(&self) -> Result<Vec<Particle>, GpuError> {
        let size = self.buffers.particles.size();
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("particle_staging"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("particle_readback_encoder"),
            });
        encoder.copy_buffer_to_buffer(&self.buffers.particles, 0, &staging, 0, size);
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| GpuError::BufferMap(e.to_string()))?;
        receiver
            .recv()
            .map_err(|e| GpuError::BufferMap(e.to_string()))?
            .map_err(|e| GpuError::BufferMap(format!("{:?}", e)))?;

        let particles = {
            let data = slice.get_mapped_range();
            bytemuck::cast_slice::<u8, Particle>(&data).to_vec()
        };
        staging.unmap();
        Ok(particles)
    }
}

/// Reject lattices the canvas cannot hold and canvases the device cannot create.
pub fn check_canvas(grid: &ParticleGrid, canvas: u32, max_dimension: u32) -> Result<(), DriverError> {
    if grid.is_empty() {
        return Err(DriverError::EmptyGrid);
    }
    if canvas > max_dimension {
        return Err(DriverError::CanvasTooLarge {
            canvas,
            limit: max_dimension,
        });
    }
    if grid.extent() > canvas as f32 {
        return Err(DriverError::CanvasTooSmall {
            extent: grid.extent(),
            canvas,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{generate_sine, mono_clip, LevelMeter};

    fn silent_source() -> AudioMetricsSource<LevelMeter> {
        let clip = mono_clip(vec![0.0; 4800], 48000);
        AudioMetricsSource::new(LevelMeter::new(Arc::new(clip)))
    }

    #[tokio::test]
    async fn test_empty_grid_rejected() {
        let ctx = match GpuContext::new().await {
            Ok(ctx) => ctx,
            Err(_) => return,
        };

        let grid = ParticleGrid {
            columns: 0,
            ..ParticleGrid::default()
        };
        let result = FrameDriver::with_grid(
            &ctx,
            &VisualizerConfig::default(),
            silent_source(),
            TextureFormat::Rgba8Unorm,
            grid,
        );
        assert!(matches!(result, Err(DriverError::EmptyGrid)));
    }

    #[tokio::test]
    async fn test_frame_index_advances() {
        let ctx = match GpuContext::new().await {
            Ok(ctx) => ctx,
            Err(_) => return,
        };

        let config = VisualizerConfig::default();
        let mut driver =
            FrameDriver::new(&ctx, &config, silent_source(), TextureFormat::Rgba8Unorm).unwrap();
        let target =
            RenderTarget::for_output(&ctx.device, "test_target", 64, 64, TextureFormat::Rgba8Unorm);

        for expected in 0..3 {
            let report = driver.render(&target).unwrap();
            assert_eq!(report.frame_index, expected);
        }
        assert_eq!(driver.frames_rendered(), 3);
    }

    #[tokio::test]
    async fn test_counters_advance_on_gpu_only() {
        let ctx = match GpuContext::new().await {
            Ok(ctx) => ctx,
            Err(_) => return,
        };

        let config = VisualizerConfig::default();
        let mut driver =
            FrameDriver::new(&ctx, &config, silent_source(), TextureFormat::Rgba8Unorm).unwrap();
        let target =
            RenderTarget::for_output(&ctx.device, "test_target", 64, 64, TextureFormat::Rgba8Unorm);
        driver.render(&target).unwrap();

        let gpu = driver.read_particles().unwrap();
        assert_eq!(gpu.len(), 3600);
        // Silence advances every counter by exactly one degree.
        assert!(gpu.iter().all(|p| (p.meta[0] - 1.0).abs() < 1e-6));
        assert_eq!(gpu[3599].meta[1], 3599.0);
        // Host copy is untouched.
        assert!(driver.particles().iter().all(|p| p.meta[0] == 0.0));
    }

    #[tokio::test]
    async fn test_music_follows_source() {
        let ctx = match GpuContext::new().await {
            Ok(ctx) => ctx,
            Err(_) => return,
        };

        let clip = mono_clip(generate_sine(440.0, 48000, 1.0, 0.5), 48000);
        let mut meter = LevelMeter::new(Arc::new(clip));
        meter.seek(24000);
        let source = AudioMetricsSource::new(meter);

        let config = VisualizerConfig::default();
        let mut driver =
            FrameDriver::new(&ctx, &config, source, TextureFormat::Rgba8Unorm).unwrap();
        let target =
            RenderTarget::for_output(&ctx.device, "test_target", 64, 64, TextureFormat::Rgba8Unorm);
        let report = driver.render(&target).unwrap();

        assert!(report.music.peak_db() > 150.0);
        assert!(report.music.lines_enabled());
        assert_eq!(driver.music(), &report.music);
    }

    #[test]
    fn test_canvas_checks() {
        let grid = ParticleGrid::default();
        assert!(check_canvas(&grid, 1200, 8192).is_ok());

        match check_canvas(&grid, 600, 8192) {
            Err(DriverError::CanvasTooSmall { extent, canvas }) => {
                assert_eq!(extent, 1200.0);
                assert_eq!(canvas, 600);
            }
            other => panic!("expected CanvasTooSmall, got {:?}", other),
        }

        assert!(matches!(
            check_canvas(&grid, 16384, 8192),
            Err(DriverError::CanvasTooLarge {
                canvas: 16384,
                limit: 8192
            })
        ));

        let empty = ParticleGrid {
            rows: 0,
            ..ParticleGrid::default()
        };
        assert!(matches!(
            check_canvas(&empty, 1200, 8192),
            Err(DriverError::EmptyGrid)
        ));
    }

    #[tokio::test]
    async fn test_low_pixel_scale_rejected() {
        let ctx = match GpuContext::new().await {
            Ok(ctx) => ctx,
            Err(_) => return,
        };

        let config = VisualizerConfig {
            pixel_scale: 1,
            ..VisualizerConfig::default()
        };
        let result = FrameDriver::new(&ctx, &config, silent_source(), TextureFormat::Rgba8Unorm);
        assert!(matches!(result, Err(DriverError::CanvasTooSmall { .. })));
    }

    #[tokio::test]
    async fn test_rejected_frame_is_reported() {
        let ctx = match GpuContext::new().await {
            Ok(ctx) => ctx,
            Err(_) => return,
        };

        let config = VisualizerConfig::default();
        let mut driver =
            FrameDriver::new(&ctx, &config, silent_source(), TextureFormat::Rgba8Unorm).unwrap();
        // The compositor was built for Rgba8Unorm, so this attachment is invalid.
        let mismatched =
            RenderTarget::for_output(&ctx.device, "bgra_target", 64, 64, TextureFormat::Bgra8Unorm);

        let result = driver.render(&mismatched);
        assert!(matches!(result, Err(RenderError::Gpu(_))), "{:?}", result);
        assert_eq!(driver.frames_rendered(), 0);

        // The driver stays usable with a matching target.
        let target =
            RenderTarget::for_output(&ctx.device, "test_target", 64, 64, TextureFormat::Rgba8Unorm);
        let report = driver.render(&target).unwrap();
        assert_eq!(report.frame_index, 0);
        assert_eq!(report.dispatches.len(), 2);
    }
}
