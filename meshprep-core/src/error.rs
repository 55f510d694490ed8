/// Error type shared by mesh building, device binding and the shader registry
use std::path::PathBuf;

use thiserror::Error;

use crate::device::ShaderStage;

/// Which keyed registry map a key belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Shader,
    Program,
}

impl std::fmt::Display for KeyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyKind::Shader => write!(f, "shader"),
            KeyKind::Program => write!(f, "program"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid vertex type: layout selector {0} is not one of 0 (base), 1 (standard), 2 (full)")]
    InvalidLayoutSelector(u32),

    #[error("malformed vertex data: {len} floats is not a multiple of the {stride}-float stride")]
    MalformedVertexData { len: usize, stride: usize },

    #[error("mesh has no vertices")]
    EmptyMesh,

    #[error("index {index} is out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    #[error("failed to load '{}': {message}", path.display())]
    FileLoad { path: PathBuf, message: String },

    #[error("{kind} key '{key}' already exists")]
    DuplicateKey { kind: KeyKind, key: String },

    #[error("cannot find {kind} key '{key}'")]
    MissingKey { kind: KeyKind, key: String },

    #[error("program '{0}' has no shaders to link")]
    EmptyLinkSet(String),

    #[error("mesh has no vertex array or vertex buffer bound")]
    UnboundResource,

    #[error("{stage:?} shader failed to compile: {log}")]
    ShaderCompile { stage: ShaderStage, log: String },

    #[error("program failed to link: {0}")]
    ProgramLink(String),

    #[error("device error: {0}")]
    Device(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::MalformedVertexData { len: 7, stride: 6 };
        assert_eq!(
            err.to_string(),
            "malformed vertex data: 7 floats is not a multiple of the 6-float stride"
        );

        let err = Error::DuplicateKey {
            kind: KeyKind::Shader,
            key: "basic_vert".to_string(),
        };
        assert_eq!(err.to_string(), "shader key 'basic_vert' already exists");

        let err = Error::FileLoad {
            path: PathBuf::from("models/crate.obj"),
            message: "missing".to_string(),
        };
        assert_eq!(err.to_string(), "failed to load 'models/crate.obj': missing");

        let err = Error::Device("out of memory".to_string());
        assert_eq!(err.to_string(), "device error: out of memory");
    }
}
