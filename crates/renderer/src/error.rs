//! Renderer error type.

use thiserror::Error;

use vkframe_resources::ResourceError;
use vkframe_rhi::{FailureClass, RhiError};

#[derive(Error, Debug)]
pub enum RendererError {
    #[error(transparent)]
    Rhi(#[from] RhiError),

    #[error(transparent)]
    Core(#[from] vkframe_core::Error),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error("Failed to load shader '{name}': {source}")]
    ShaderSource {
        name: String,
        #[source]
        source: ResourceError,
    },

    #[error("Unknown shader '{0}'")]
    UnknownShader(String),

    #[error("Unknown pipeline '{0}'")]
    UnknownPipeline(String),
}

impl RendererError {
    /// Failure class, forwarded from the RHI where one applies.
    pub fn class(&self) -> FailureClass {
        match self {
            RendererError::Rhi(e) => e.class(),
            RendererError::ShaderSource { .. } | RendererError::UnknownShader(_) => {
                FailureClass::ShaderLoad
            }
            RendererError::Core(_)
            | RendererError::Resource(_)
            | RendererError::UnknownPipeline(_) => FailureClass::Setup,
        }
    }
}

pub type RendererResult<T> = std::result::Result<T, RendererError>;
