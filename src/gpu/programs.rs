//! Compile-time registry of the compute programs and their WGSL sources.
//!
//! Workgroup sizes are decided at runtime from device limits, so each source
//! is composed with a small prelude of `const` declarations before it is
//! validated and handed to wgpu.

use super::plan::WorkgroupTile;

/// Errors raised while preparing a compute program.
#[derive(Debug, thiserror::Error)]
pub enum ProgramError {
    #[error("{program:?} program failed to parse: {message}")]
    Parse {
        program: ComputeProgram,
        message: String,
    },
    #[error("{program:?} program failed validation: {message}")]
    Validation {
        program: ComputeProgram,
        message: String,
    },
    #[error("{program:?} program has no compute entry point named `{entry_point}`")]
    MissingEntryPoint {
        program: ComputeProgram,
        entry_point: &'static str,
    },
}

/// The two compute programs dispatched every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComputeProgram {
    /// Redraws the static line pattern into the canvas.
    Background,
    /// Draws every particle and its music-driven lines; advances phase counters.
    Particles,
}

impl ComputeProgram {
    pub fn all() -> &'static [ComputeProgram] {
        &[ComputeProgram::Background, ComputeProgram::Particles]
    }

    pub fn label(&self) -> &'static str {
        match self {
            ComputeProgram::Background => "background",
            ComputeProgram::Particles => "particles",
        }
    }

    pub fn entry_point(&self) -> &'static str {
        match self {
            ComputeProgram::Background => "draw_background",
            ComputeProgram::Particles => "draw_particles",
        }
    }

    fn source(&self) -> &'static str {
        match self {
            ComputeProgram::Background => include_str!("shaders/background.wgsl"),
            ComputeProgram::Particles => include_str!("shaders/particles.wgsl"),
        }
    }

    /// WGSL for this program with the workgroup constants filled in.
    pub fn compose(&self, tile: WorkgroupTile, linear_group: u32) -> String {
        format!(
            "const TILE_X: u32 = {}u;\nconst TILE_Y: u32 = {}u;\nconst LINEAR_GROUP: u32 = {}u;\n\n{}",
            tile.width,
            tile.height,
            linear_group,
            self.source()
        )
    }
}

/// A composed program that passed parsing and validation.
#[derive(Debug, Clone)]
pub struct ValidatedProgram {
    pub program: ComputeProgram,
    pub source: String,
}

impl ValidatedProgram {
    pub fn entry_point(&self) -> &'static str {
        self.program.entry_point()
    }
}

/// Compose, parse, and validate `program`, checking its entry point exists.
pub fn prepare(
    program: ComputeProgram,
    tile: WorkgroupTile,
    linear_group: u32,
) -> Result<ValidatedProgram, ProgramError> {
    let source = program.compose(tile, linear_group);

    let module = naga::front::wgsl::parse_str(&source).map_err(|e| ProgramError::Parse {
        program,
        message: e.emit_to_string(&source),
    })?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::default(),
    );
    validator
        .validate(&module)
        .map_err(|e| ProgramError::Validation {
            program,
            message: format!("{:?}", e),
        })?;

    let entry_point = program.entry_point();
    let found = module
        .entry_points
        .iter()
        .any(|ep| ep.name == entry_point && ep.stage == naga::ShaderStage::Compute);
    if !found {
        return Err(ProgramError::MissingEntryPoint {
            program,
            entry_point,
        });
    }

    log::debug!("Validated {} program", program.label());
    Ok(ValidatedProgram { program, source })
}
