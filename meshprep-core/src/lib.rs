/// meshprep core library - vertex layouts, mesh building and device binding
///
/// Builds fixed-layout vertex records from raw float arrays or OBJ files,
/// generates tangent frames for normal mapping, and uploads the result through
/// a `GraphicsDevice` together with the attribute contract shaders rely on.

pub mod binder;
pub mod device;
pub mod error;
pub mod geometry;
#[cfg(feature = "gl")]
pub mod gl_device;
pub mod headless;
pub mod mesh;
pub mod obj;
pub mod shader;
pub mod tangent;
pub mod vertex;

// Re-export commonly used types
pub use binder::GpuMesh;
pub use device::{BufferId, BufferTarget, GraphicsDevice, ProgramId, ShaderId, ShaderStage, VertexArrayId};
pub use error::{Error, KeyKind, Result};
pub use geometry::{LoadOptions, MeshData, RawOptions, SubMesh};
#[cfg(feature = "gl")]
pub use gl_device::GlDevice;
pub use headless::{DrawCall, HeadlessDevice};
pub use mesh::Mesh;
pub use obj::{Material, ObjScene, ObjShape};
pub use shader::ShaderRegistry;
pub use tangent::{calculate_tangents, IndexWalk, TangentFrame, TangentOptions};
pub use vertex::{BaseVertex, FullVertex, StandardVertex, VertexAttribute, VertexLayout, Vertices};
