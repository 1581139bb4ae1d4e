//! Crate-level error types.

use std::fmt;

/// Errors produced by the sensorscope crate.
#[derive(Debug)]
pub enum SceneError {
    /// A drawable's shader program could not be bound.
    ShaderUnavailable {
        /// Label of the shader that failed to bind.
        shader: String,
    },
    /// A texture-backed drawable has no image it can upload.
    TextureUnavailable,
    /// The drawable has nothing to upload or draw.
    EmptyInput,
    /// Generic I/O failure.
    Io(std::io::Error),
    /// Failed to spawn a worker thread.
    ThreadSpawn(std::io::Error),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
}

impl fmt::Display for SceneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShaderUnavailable { shader } => {
                write!(f, "shader '{shader}' could not be bound")
            }
            Self::TextureUnavailable => write!(f, "no image available for texture"),
            Self::EmptyInput => write!(f, "drawable input is empty"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::ThreadSpawn(e) => {
                write!(f, "failed to spawn worker thread: {e}")
            }
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
        }
    }
}

impl std::error::Error for SceneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) | Self::ThreadSpawn(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SceneError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
