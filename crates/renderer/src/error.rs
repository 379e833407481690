use std::fmt;

use crate::capability::ShaderModelLevel;

/// Pipeline stage a shader diagnostic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Vertex,
    Fragment,
}

impl Stage {
    pub(crate) fn naga(self) -> wgpu::naga::ShaderStage {
        match self {
            Stage::Vertex => wgpu::naga::ShaderStage::Vertex,
            Stage::Fragment => wgpu::naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Vertex => f.write_str("vertex"),
            Stage::Fragment => f.write_str("fragment"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShaderError {
    #[error("failed to compile {stage} shader:\n{diagnostic}")]
    Compile { stage: Stage, diagnostic: String },
    #[error("failed to link shader program: {reason}")]
    Link { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CapabilityError {
    #[error("no graphics adapter is available for this surface")]
    NoAdapter,
    #[error("adapter {adapter} supports shader model {found}, {required} is required")]
    Insufficient {
        adapter: String,
        found: ShaderModelLevel,
        required: ShaderModelLevel,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Capability(#[from] CapabilityError),
    #[error(transparent)]
    Shader(#[from] ShaderError),
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error("graphics backend failure: {0}")]
    Backend(String),
    #[error("cannot {operation} once the render loop is destroyed")]
    Destroyed { operation: &'static str },
}

impl RenderError {
    /// Returns the surface error when the failure came from frame acquisition.
    pub fn as_surface_error(&self) -> Option<&wgpu::SurfaceError> {
        match self {
            RenderError::Surface(err) => Some(err),
            _ => None,
        }
    }
}
