//! GPU buffers for the particle array and the music record.

use wgpu::util::DeviceExt;
use wgpu::{Buffer, BufferUsages, Device, Queue};

use super::music::MusicMetrics;
use super::particles::Particle;

/// Buffers bound by the particle pass.
pub struct FrameBuffers {
    /// Particle array. Uploaded once, then owned by the shader.
    pub particles: Buffer,
    /// A single `MusicMetrics` record, rewritten every frame.
    pub music: Buffer,
    particle_count: u32,
}

impl FrameBuffers {
    /// Create both buffers initialised from host data.
    pub fn new(device: &Device, particles: &[Particle], music: &MusicMetrics) -> Self {
        let particle_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("particle_buffer"),
            contents: bytemuck::cast_slice(particles),
            usage: BufferUsages::STORAGE | BufferUsages::COPY_DST | BufferUsages::COPY_SRC,
        });

        let music_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("music_buffer"),
            contents: bytemuck::bytes_of(music),
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        });

        Self {
            particles: particle_buffer,
            music: music_buffer,
            particle_count: particles.len() as u32,
        }
    }

    pub fn particle_count(&self) -> u32 {
        self.particle_count
    }

    /// Stage a new music record for the next submission.
    pub fn write_music(&self, queue: &Queue, music: &MusicMetrics) {
        queue.write_buffer(&self.music, 0, bytemuck::bytes_of(music));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::particles::ParticleGrid;
    use crate::gpu::GpuContext;

    #[tokio::test]
    async fn test_buffer_sizes_are_exact() {
        let ctx = match GpuContext::new().await {
            Ok(ctx) => ctx,
            Err(_) => return,
        };

        let particles = ParticleGrid::default().build();
        let music = MusicMetrics {
            power: [80.0, 100.0],
            params: [1.0, 0.0],
        };
        let buffers = FrameBuffers::new(&ctx.device, &particles, &music);

        assert_eq!(buffers.particle_count(), 3600);
        assert_eq!(
            buffers.particles.size(),
            (3600 * std::mem::size_of::<Particle>()) as u64
        );
        assert_eq!(
            buffers.music.size(),
            std::mem::size_of::<MusicMetrics>() as u64
        );
    }
}
