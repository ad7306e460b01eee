//! Integration tests for the frame driver. Skipped when no GPU is available.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use music_visualizer::audio::{
    generate_sine, generate_white_noise, mono_clip, AudioMetricsSource, LevelMeter,
};
use music_visualizer::gpu::{ComputeProgram, RenderTarget};
use music_visualizer::{FrameDriver, GpuContext, ParticleGrid, PresentTarget, VisualizerConfig};

const SAMPLE_RATE: u32 = 48000;
const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

async fn create_gpu_context() -> Option<GpuContext> {
    GpuContext::new().await.ok()
}

/// Offscreen target that counts how often it is presented.
struct CountingTarget<'a> {
    target: &'a RenderTarget,
    presents: Rc<Cell<u32>>,
}

impl PresentTarget for CountingTarget<'_> {
    fn view(&self) -> &wgpu::TextureView {
        self.target.view()
    }

    fn present(self) {
        self.presents.set(self.presents.get() + 1);
    }
}

fn loud_source() -> AudioMetricsSource<LevelMeter> {
    let clip = mono_clip(generate_white_noise(SAMPLE_RATE, 1.0, 0.9, 3), SAMPLE_RATE);
    let mut meter = LevelMeter::new(Arc::new(clip));
    meter.seek(SAMPLE_RATE as usize / 2);
    AudioMetricsSource::new(meter)
}

fn output_target(ctx: &GpuContext) -> RenderTarget {
    RenderTarget::for_output(&ctx.device, "output", 600, 600, TARGET_FORMAT)
}

#[tokio::test]
async fn test_single_frame_dispatches_and_presents_once() {
    let Some(ctx) = create_gpu_context().await else {
        return;
    };

    let config = VisualizerConfig::default();
    let mut driver = FrameDriver::new(&ctx, &config, loud_source(), TARGET_FORMAT).unwrap();
    let output = output_target(&ctx);
    let presents = Rc::new(Cell::new(0));

    let report = driver
        .render(CountingTarget {
            target: &output,
            presents: Rc::clone(&presents),
        })
        .unwrap();

    assert_eq!(presents.get(), 1);
    assert_eq!(report.frame_index, 0);
    assert_eq!(report.dispatches.len(), 2);

    let background = &report.dispatches[0];
    assert_eq!(background.program, ComputeProgram::Background);
    assert_eq!(background.grid, [1200, 1200, 1]);

    let particles = &report.dispatches[1];
    assert_eq!(particles.program, ComputeProgram::Particles);
    assert_eq!(particles.grid, [3600, 1, 1]);

    let limits = ctx.limits();
    for dispatch in &report.dispatches {
        let [x, y, z] = dispatch.workgroup;
        assert!(x * y * z <= limits.max_compute_invocations_per_workgroup);
        let groups = dispatch.workgroups();
        for axis in 0..3 {
            assert!(groups[axis] * dispatch.workgroup[axis] >= dispatch.grid[axis]);
        }
    }
}

#[tokio::test]
async fn test_canvas_shows_particles() {
    let Some(ctx) = create_gpu_context().await else {
        return;
    };

    let config = VisualizerConfig::default();
    let mut driver = FrameDriver::new(&ctx, &config, loud_source(), TARGET_FORMAT).unwrap();
    let output = output_target(&ctx);
    driver.render(&output).unwrap();

    let pixels = driver.read_canvas().unwrap();
    let width = driver.canvas().width() as usize;
    assert_eq!(pixels.len(), width * driver.canvas().height() as usize * 4);

    let pixel = |x: usize, y: usize| {
        let i = (y * width + x) * 4;
        [pixels[i], pixels[i + 1], pixels[i + 2], pixels[i + 3]]
    };

    // Particle centers are painted brighter than the background base.
    let first = pixel(8, 8);
    let last = pixel(1188, 1188);
    assert!(first[0] as u32 + first[1] as u32 + first[2] as u32 > 60, "{:?}", first);
    assert!(last[0] as u32 + last[1] as u32 + last[2] as u32 > 60, "{:?}", last);

    // Between particles only the background remains, fully opaque.
    let gap = pixel(2, 18);
    assert_eq!(gap[3], 255);
    assert!(gap[0] < 40 && gap[1] < 40 && gap[2] < 60, "{:?}", gap);
}

/// Render one frame with `config` and return the canvas pixels and width.
fn render_canvas(ctx: &GpuContext, config: &VisualizerConfig) -> (Vec<u8>, usize) {
    let mut driver = FrameDriver::new(ctx, config, loud_source(), TARGET_FORMAT).unwrap();
    let output = output_target(ctx);
    let report = driver.render(&output).unwrap();
    assert_eq!(report.music.params[0], config.intensity_flag());
    (driver.read_canvas().unwrap(), driver.canvas().width() as usize)
}

#[tokio::test]
async fn test_reduce_intensity_removes_lines_only() {
    let Some(ctx) = create_gpu_context().await else {
        return;
    };

    let normal = VisualizerConfig::default();
    let reduced = VisualizerConfig {
        reduce_intensity: true,
        ..VisualizerConfig::default()
    };
    let (with_lines, width) = render_canvas(&ctx, &normal);
    let (without_lines, _) = render_canvas(&ctx, &reduced);
    assert_eq!(with_lines.len(), without_lines.len());

    let pixel = |pixels: &[u8], x: usize, y: usize| {
        let i = (y * width + x) * 4;
        [pixels[i], pixels[i + 1], pixels[i + 2], pixels[i + 3]]
    };

    // Lines are the only difference, and there is one per particle.
    let differing = with_lines
        .chunks_exact(4)
        .zip(without_lines.chunks_exact(4))
        .filter(|(a, b)| a != b)
        .count();
    assert!(differing > 1000, "only {} pixels differ", differing);

    // Lines run up and to the right, so the left half of every disc is
    // drawn identically in both sessions.
    for particle in ParticleGrid::default().build() {
        let x = particle.position[0] as usize - 3;
        let y = particle.position[1] as usize;
        assert_eq!(
            pixel(&with_lines, x, y),
            pixel(&without_lines, x, y),
            "disc of particle {} differs",
            particle.meta[1]
        );
    }

    // Near a particle, lines reach beyond the disc.
    let (cx, cy) = (608i64, 608i64);
    let mut outside_disc = 0;
    for dy in -24i64..=24 {
        for dx in -24i64..=24 {
            let (x, y) = ((cx + dx) as usize, (cy + dy) as usize);
            if pixel(&with_lines, x, y) == pixel(&without_lines, x, y) {
                continue;
            }
            if dx * dx + dy * dy > 49 {
                outside_disc += 1;
            }
        }
    }
    assert!(outside_disc > 0);
}

#[tokio::test]
async fn test_music_refreshed_every_frame() {
    let Some(ctx) = create_gpu_context().await else {
        return;
    };

    let clip = mono_clip(generate_sine(330.0, SAMPLE_RATE, 1.0, 0.5), SAMPLE_RATE);
    let source = AudioMetricsSource::new(LevelMeter::new(Arc::new(clip)));
    let config = VisualizerConfig::default();
    let mut driver = FrameDriver::new(&ctx, &config, source, TARGET_FORMAT).unwrap();
    let output = output_target(&ctx);

    // Cursor at the start: nothing has played yet.
    let quiet = driver.render(&output).unwrap();
    assert_eq!(quiet.music.peak_db(), 0.0);

    driver.source_mut().meter_mut().seek(SAMPLE_RATE as usize / 2);
    let loud = driver.render(&output).unwrap();
    assert!(loud.music.peak_db() > 150.0);
    assert_eq!(loud.music.params[0], 1.0);
}

#[tokio::test]
async fn test_particle_buffer_not_reuploaded() {
    let Some(ctx) = create_gpu_context().await else {
        return;
    };

    let config = VisualizerConfig::default();
    let mut driver = FrameDriver::new(&ctx, &config, loud_source(), TARGET_FORMAT).unwrap();
    let output = output_target(&ctx);

    driver.render(&output).unwrap();
    let after_one = driver.read_particles().unwrap();
    driver.render(&output).unwrap();
    let after_two = driver.read_particles().unwrap();

    // Counters keep accumulating on the GPU; positions and indices never change.
    for (a, b) in after_one.iter().zip(&after_two) {
        assert_eq!(a.position, b.position);
        assert_eq!(a.meta[1], b.meta[1]);
        assert!(b.meta[0] != a.meta[0]);
    }
    assert_eq!(after_two[0].position, [8.0, 8.0]);
}
