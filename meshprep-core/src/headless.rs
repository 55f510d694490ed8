/// In-memory graphics device
///
/// Keeps every resource the binder and registry create, in the shape a GPU
/// driver would: buffer bytes, per-vertex-array attribute bindings and element
/// buffer, compiled shaders and linked programs. Draw calls are recorded
/// instead of executed. Tests use it to observe exactly what was uploaded, and
/// software renderers read vertex data back through `fetch_attribute`.
use std::collections::{BTreeMap, HashMap};

use log::warn;

use crate::device::{
    BufferId, BufferTarget, GraphicsDevice, ProgramId, ShaderId, ShaderStage, VertexArrayId,
};
use crate::error::{Error, Result};
use crate::vertex::{ComponentType, VertexAttribute};

/// An attribute as captured by a vertex array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeBinding {
    pub buffer: BufferId,
    pub components: u32,
    pub component_type: ComponentType,
    pub normalized: bool,
    pub stride: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexArrayState {
    /// Keyed by attribute location
    pub attributes: BTreeMap<u32, AttributeBinding>,
    pub element_buffer: Option<BufferId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawCall {
    Elements {
        vertex_array: VertexArrayId,
        element_buffer: BufferId,
        index_count: usize,
        program: Option<ProgramId>,
    },
    Arrays {
        vertex_array: VertexArrayId,
        vertex_count: usize,
        program: Option<ProgramId>,
    },
}

#[derive(Debug, Clone, PartialEq)]
struct ShaderState {
    stage: ShaderStage,
    source: String,
}

#[derive(Debug, Default)]
pub struct HeadlessDevice {
    next_id: u32,
    vertex_arrays: HashMap<VertexArrayId, VertexArrayState>,
    buffers: HashMap<BufferId, Vec<u8>>,
    shaders: HashMap<ShaderId, ShaderState>,
    programs: HashMap<ProgramId, Vec<ShaderId>>,
    bound_vertex_array: Option<VertexArrayId>,
    bound_array_buffer: Option<BufferId>,
    bound_element_buffer: Option<BufferId>,
    active_program: Option<ProgramId>,
    draws: Vec<DrawCall>,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    /// Vertex arrays plus buffers currently alive
    pub fn live_mesh_resources(&self) -> usize {
        self.vertex_arrays.len() + self.buffers.len()
    }

    /// Shaders plus programs currently alive
    pub fn live_shader_resources(&self) -> usize {
        self.shaders.len() + self.programs.len()
    }

    pub fn vertex_array(&self, id: VertexArrayId) -> Option<&VertexArrayState> {
        self.vertex_arrays.get(&id)
    }

    pub fn buffer(&self, id: BufferId) -> Option<&[u8]> {
        self.buffers.get(&id).map(Vec::as_slice)
    }

    pub fn bound_vertex_array(&self) -> Option<VertexArrayId> {
        self.bound_vertex_array
    }

    pub fn active_program(&self) -> Option<ProgramId> {
        self.active_program
    }

    pub fn draws(&self) -> &[DrawCall] {
        &self.draws
    }

    pub fn take_draws(&mut self) -> Vec<DrawCall> {
        std::mem::take(&mut self.draws)
    }

    /// Shader stages a program was linked from
    pub fn program_stages(&self, id: ProgramId) -> Option<Vec<ShaderStage>> {
        let shaders = self.programs.get(&id)?;
        Some(
            shaders
                .iter()
                .filter_map(|shader| self.shaders.get(shader).map(|s| s.stage))
                .collect(),
        )
    }

    pub fn shader_source(&self, id: ShaderId) -> Option<&str> {
        self.shaders.get(&id).map(|s| s.source.as_str())
    }

    /// Read the float components of the attribute at `location` for vertex `vertex`
    ///
    /// Goes through the registered stride and offset exactly as a GPU vertex
    /// fetch would, so it returns `None` when the contract points outside the
    /// buffer.
    pub fn fetch_attribute(&self, vertex_array: VertexArrayId, location: u32, vertex: usize) -> Option<Vec<f32>> {
        let binding = self.vertex_arrays.get(&vertex_array)?.attributes.get(&location)?;
        let bytes = self.buffers.get(&binding.buffer)?;
        let size = binding.components as usize * binding.component_type.size();
        let start = vertex * binding.stride + binding.offset;
        let field = bytes.get(start..start + size)?;
        Some(
            field
                .chunks_exact(4)
                .map(bytemuck::pod_read_unaligned::<f32>)
                .collect(),
        )
    }

    /// Indices stored in an element buffer
    pub fn indices(&self, id: BufferId) -> Option<Vec<u32>> {
        let bytes = self.buffers.get(&id)?;
        Some(
            bytes
                .chunks_exact(4)
                .map(bytemuck::pod_read_unaligned::<u32>)
                .collect(),
        )
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn create_vertex_array(&mut self) -> Result<VertexArrayId> {
        let id = VertexArrayId(self.next_id());
        self.vertex_arrays.insert(id, VertexArrayState::default());
        Ok(id)
    }

    fn delete_vertex_array(&mut self, id: VertexArrayId) {
        if self.vertex_arrays.remove(&id).is_none() {
            warn!("deleting unknown vertex array {:?}", id);
        }
        if self.bound_vertex_array == Some(id) {
            self.bound_vertex_array = None;
        }
    }

    fn bind_vertex_array(&mut self, id: Option<VertexArrayId>) {
        self.bound_vertex_array = id.filter(|id| self.vertex_arrays.contains_key(id));
        self.bound_element_buffer = self
            .bound_vertex_array
            .and_then(|vao| self.vertex_arrays[&vao].element_buffer);
    }

    fn create_buffer(&mut self, target: BufferTarget, data: &[u8]) -> Result<BufferId> {
        let id = BufferId(self.next_id());
        self.buffers.insert(id, data.to_vec());
        self.bind_buffer(target, Some(id));
        Ok(id)
    }

    fn delete_buffer(&mut self, id: BufferId) {
        if self.buffers.remove(&id).is_none() {
            warn!("deleting unknown buffer {:?}", id);
        }
        if self.bound_array_buffer == Some(id) {
            self.bound_array_buffer = None;
        }
        if self.bound_element_buffer == Some(id) {
            self.bound_element_buffer = None;
        }
        for state in self.vertex_arrays.values_mut() {
            if state.element_buffer == Some(id) {
                state.element_buffer = None;
            }
        }
    }

    fn bind_buffer(&mut self, target: BufferTarget, id: Option<BufferId>) {
        match target {
            BufferTarget::Array => self.bound_array_buffer = id,
            BufferTarget::Element => {
                self.bound_element_buffer = id;
                if let Some(vao) = self.bound_vertex_array {
                    if let Some(state) = self.vertex_arrays.get_mut(&vao) {
                        state.element_buffer = id;
                    }
                }
            }
        }
    }

    fn vertex_attribute(&mut self, attribute: &VertexAttribute, stride: usize) {
        let (Some(vao), Some(buffer)) = (self.bound_vertex_array, self.bound_array_buffer) else {
            warn!(
                "vertex attribute {} registered without a bound vertex array and array buffer",
                attribute.location
            );
            return;
        };
        if let Some(state) = self.vertex_arrays.get_mut(&vao) {
            state.attributes.insert(
                attribute.location,
                AttributeBinding {
                    buffer,
                    components: attribute.components,
                    component_type: attribute.component_type,
                    normalized: attribute.normalized,
                    stride,
                    offset: attribute.offset,
                },
            );
        }
    }

    fn draw_elements(&mut self, index_count: usize) {
        match (self.bound_vertex_array, self.bound_element_buffer) {
            (Some(vertex_array), Some(element_buffer)) => self.draws.push(DrawCall::Elements {
                vertex_array,
                element_buffer,
                index_count,
                program: self.active_program,
            }),
            _ => warn!("draw_elements without a bound vertex array and element buffer"),
        }
    }

    fn draw_arrays(&mut self, vertex_count: usize) {
        match self.bound_vertex_array {
            Some(vertex_array) => self.draws.push(DrawCall::Arrays {
                vertex_array,
                vertex_count,
                program: self.active_program,
            }),
            None => warn!("draw_arrays without a bound vertex array"),
        }
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId> {
        if source.trim().is_empty() {
            return Err(Error::ShaderCompile {
                stage,
                log: "empty shader source".to_string(),
            });
        }
        if !source.contains("main") {
            return Err(Error::ShaderCompile {
                stage,
                log: "no main entry point".to_string(),
            });
        }
        let id = ShaderId(self.next_id());
        self.shaders.insert(
            id,
            ShaderState {
                stage,
                source: source.to_string(),
            },
        );
        Ok(id)
    }

    fn delete_shader(&mut self, id: ShaderId) {
        if self.shaders.remove(&id).is_none() {
            warn!("deleting unknown shader {:?}", id);
        }
    }

    fn link_program(&mut self, shaders: &[ShaderId]) -> Result<ProgramId> {
        if shaders.is_empty() {
            return Err(Error::ProgramLink("no shaders attached".to_string()));
        }
        let mut has_vertex_stage = false;
        for shader in shaders {
            match self.shaders.get(shader) {
                Some(state) => has_vertex_stage |= state.stage == ShaderStage::Vertex,
                None => return Err(Error::ProgramLink(format!("unknown shader {:?}", shader))),
            }
        }
        if !has_vertex_stage {
            return Err(Error::ProgramLink("missing vertex stage".to_string()));
        }
        let id = ProgramId(self.next_id());
        self.programs.insert(id, shaders.to_vec());
        Ok(id)
    }

    fn delete_program(&mut self, id: ProgramId) {
        if self.programs.remove(&id).is_none() {
            warn!("deleting unknown program {:?}", id);
        }
        if self.active_program == Some(id) {
            self.active_program = None;
        }
    }

    fn use_program(&mut self, id: Option<ProgramId>) {
        self.active_program = id.filter(|id| self.programs.contains_key(id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vertex::{BaseVertex, VertexRecord};

    #[test]
    fn test_element_buffer_is_captured_by_vertex_array() {
        let mut device = HeadlessDevice::new();
        let vao = device.create_vertex_array().unwrap();
        device.bind_vertex_array(Some(vao));
        let ebo = device
            .create_buffer(BufferTarget::Element, bytemuck::cast_slice(&[0u32, 1, 2]))
            .unwrap();
        device.bind_vertex_array(None);
        device.bind_buffer(BufferTarget::Element, None);

        assert_eq!(device.vertex_array(vao).unwrap().element_buffer, Some(ebo));

        device.bind_vertex_array(Some(vao));
        device.draw_elements(3);
        assert_eq!(
            device.draws(),
            &[DrawCall::Elements {
                vertex_array: vao,
                element_buffer: ebo,
                index_count: 3,
                program: None,
            }]
        );
    }

    #[test]
    fn test_fetch_attribute_follows_stride_and_offset() {
        let mut device = HeadlessDevice::new();
        let vertices = [
            BaseVertex {
                position: [1.0, 2.0, 3.0],
                color: [0.1, 0.2, 0.3],
            },
            BaseVertex {
                position: [4.0, 5.0, 6.0],
                color: [0.4, 0.5, 0.6],
            },
        ];
        let vao = device.create_vertex_array().unwrap();
        device.bind_vertex_array(Some(vao));
        device
            .create_buffer(BufferTarget::Array, bytemuck::cast_slice(&vertices))
            .unwrap();
        for attribute in BaseVertex::ATTRIBUTES {
            device.vertex_attribute(attribute, 24);
        }

        assert_eq!(device.fetch_attribute(vao, 0, 1), Some(vec![4.0, 5.0, 6.0]));
        assert_eq!(device.fetch_attribute(vao, 1, 0), Some(vec![0.1, 0.2, 0.3]));
        assert_eq!(device.fetch_attribute(vao, 1, 2), None);
        assert_eq!(device.fetch_attribute(vao, 7, 0), None);
    }

    #[test]
    fn test_shader_compile_and_link_rules() {
        let mut device = HeadlessDevice::new();
        assert!(matches!(
            device.compile_shader(ShaderStage::Vertex, "  "),
            Err(Error::ShaderCompile { .. })
        ));

        let fragment = device
            .compile_shader(ShaderStage::Fragment, "void main() {}")
            .unwrap();
        assert!(matches!(
            device.link_program(&[fragment]),
            Err(Error::ProgramLink(_))
        ));

        let vertex = device
            .compile_shader(ShaderStage::Vertex, "void main() {}")
            .unwrap();
        let program = device.link_program(&[vertex, fragment]).unwrap();
        assert_eq!(
            device.program_stages(program),
            Some(vec![ShaderStage::Vertex, ShaderStage::Fragment])
        );
        assert_eq!(device.live_shader_resources(), 3);

        device.use_program(Some(program));
        assert_eq!(device.active_program(), Some(program));
        device.delete_program(program);
        assert_eq!(device.active_program(), None);
    }
}
