/// The graphics device interface the mesh binder and shader registry drive
///
/// The calls mirror a classic bind-to-edit API: buffers are created bound to a
/// target, attributes are registered against the currently bound vertex array
/// and array buffer, and the element buffer binding is captured by the bound
/// vertex array.
use crate::error::Result;
use crate::vertex::VertexAttribute;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexArrayId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Vertex records
    Array,
    /// Triangle indices
    Element,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Geometry,
}

pub trait GraphicsDevice {
    fn create_vertex_array(&mut self) -> Result<VertexArrayId>;
    fn delete_vertex_array(&mut self, id: VertexArrayId);
    fn bind_vertex_array(&mut self, id: Option<VertexArrayId>);

    /// Create a buffer, bind it to `target` and upload `data` for static use
    fn create_buffer(&mut self, target: BufferTarget, data: &[u8]) -> Result<BufferId>;
    fn delete_buffer(&mut self, id: BufferId);
    fn bind_buffer(&mut self, target: BufferTarget, id: Option<BufferId>);

    /// Enable `attribute` on the bound vertex array, sourced from the bound array buffer
    fn vertex_attribute(&mut self, attribute: &VertexAttribute, stride: usize);

    /// Draw `index_count` u32 indices from the bound element buffer as triangles
    fn draw_elements(&mut self, index_count: usize);
    /// Draw `vertex_count` vertices in order as triangles
    fn draw_arrays(&mut self, vertex_count: usize);

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId>;
    fn delete_shader(&mut self, id: ShaderId);
    fn link_program(&mut self, shaders: &[ShaderId]) -> Result<ProgramId>;
    fn delete_program(&mut self, id: ProgramId);
    fn use_program(&mut self, id: Option<ProgramId>);
}
