//! Compute pipeline creation for the background and particle passes.

use wgpu::{BindGroupLayout, ComputePipeline, Device};

use super::programs::{ComputeProgram, ValidatedProgram};
use super::textures::CANVAS_FORMAT;

/// Bind group layouts for the two compute passes.
pub struct FrameLayouts {
    pub background: BindGroupLayout,
    pub particles: BindGroupLayout,
}

impl FrameLayouts {
    pub fn new(device: &Device) -> Self {
        let background = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("background_layout"),
            entries: &[Self::canvas_entry(0)],
        });

        let particles = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("particles_layout"),
            entries: &[
                Self::canvas_entry(0),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        Self {
            background,
            particles,
        }
    }

    pub fn for_program(&self, program: ComputeProgram) -> &BindGroupLayout {
        match program {
            ComputeProgram::Background => &self.background,
            ComputeProgram::Particles => &self.particles,
        }
    }

    fn canvas_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
        wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::StorageTexture {
                access: wgpu::StorageTextureAccess::WriteOnly,
                format: CANVAS_FORMAT,
                view_dimension: wgpu::TextureViewDimension::D2,
            },
            count: None,
        }
    }
}

/// Compute pipelines for both passes.
pub struct FramePipelines {
    pub background: ComputePipeline,
    pub particles: ComputePipeline,
}

impl FramePipelines {
    pub fn new(
        device: &Device,
        layouts: &FrameLayouts,
        background: &ValidatedProgram,
        particles: &ValidatedProgram,
    ) -> Self {
        Self {
            background: Self::create_pipeline(device, layouts, background),
            particles: Self::create_pipeline(device, layouts, particles),
        }
    }

    pub fn for_program(&self, program: ComputeProgram) -> &ComputePipeline {
        match program {
            ComputeProgram::Background => &self.background,
            ComputeProgram::Particles => &self.particles,
        }
    }

    fn create_pipeline(
        device: &Device,
        layouts: &FrameLayouts,
        prepared: &ValidatedProgram,
    ) -> ComputePipeline {
        let label = prepared.program.label();
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{}_shader", label)),
            source: wgpu::ShaderSource::Wgsl(prepared.source.as_str().into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{}_pipeline_layout", label)),
            bind_group_layouts: &[layouts.for_program(prepared.program)],
            immediate_size: 0,
        });

        device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(&format!("{}_pipeline", label)),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some(prepared.entry_point()),
            compilation_options: Default::default(),
            cache: None,
        })
    }
}
