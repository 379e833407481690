use std::fmt;

use crate::error::CapabilityError;

/// Coarse programmable-pipeline level reported by an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ShaderModelLevel {
    /// Programmable vertex and fragment stages, the baseline the lamp needs.
    #[default]
    Sm2,
    Sm4,
    Sm5,
}

impl From<wgpu::ShaderModel> for ShaderModelLevel {
    fn from(model: wgpu::ShaderModel) -> Self {
        match model {
            wgpu::ShaderModel::Sm2 => ShaderModelLevel::Sm2,
            wgpu::ShaderModel::Sm4 => ShaderModelLevel::Sm4,
            wgpu::ShaderModel::Sm5 => ShaderModelLevel::Sm5,
        }
    }
}

impl fmt::Display for ShaderModelLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderModelLevel::Sm2 => f.write_str("sm2"),
            ShaderModelLevel::Sm4 => f.write_str("sm4"),
            ShaderModelLevel::Sm5 => f.write_str("sm5"),
        }
    }
}

/// Compares an adapter's level against the configured minimum.
pub fn check_shader_model(
    adapter: &str,
    found: ShaderModelLevel,
    required: ShaderModelLevel,
) -> Result<(), CapabilityError> {
    if found >= required {
        return Ok(());
    }
    let err = CapabilityError::Insufficient {
        adapter: adapter.to_string(),
        found,
        required,
    };
    tracing::error!(adapter, %found, %required, "graphics adapter is not shader capable enough");
    Err(err)
}

/// Checks a live adapter's downlevel shader model.
pub(crate) fn check_adapter(
    adapter: &wgpu::Adapter,
    required: ShaderModelLevel,
) -> Result<ShaderModelLevel, CapabilityError> {
    let info = adapter.get_info();
    let found = ShaderModelLevel::from(adapter.get_downlevel_capabilities().shader_model);
    tracing::debug!(name = %info.name, backend = ?info.backend, %found, "adapter shader model");
    check_shader_model(&info.name, found, required)?;
    Ok(found)
}
