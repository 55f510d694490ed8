/// Uploading mesh data to a graphics device and drawing it
use log::{debug, warn};

use crate::device::{BufferId, BufferTarget, GraphicsDevice, VertexArrayId};
use crate::error::{Error, Result};
use crate::geometry::MeshData;

/// Device resources owned by one mesh
///
/// Handles are `None` until `upload` succeeds and again after `release`.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct GpuMesh {
    vertex_array: Option<VertexArrayId>,
    vertex_buffer: Option<BufferId>,
    index_buffer: Option<BufferId>,
    index_count: usize,
}

impl GpuMesh {
    /// Create the vertex array, vertex buffer and index buffer for `data` and
    /// register its layout's attribute contract
    ///
    /// Anything already created is released again if a later step fails.
    pub fn upload<D: GraphicsDevice + ?Sized>(device: &mut D, data: &MeshData) -> Result<Self> {
        let mut gpu = GpuMesh::default();
        if let Err(e) = gpu.upload_into(device, data) {
            device.bind_vertex_array(None);
            gpu.release(device);
            return Err(e);
        }
        Ok(gpu)
    }

    fn upload_into<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D, data: &MeshData) -> Result<()> {
        let layout = data.layout();
        let vertex_bytes = data.vertices().as_bytes();
        let index_bytes: &[u8] = bytemuck::cast_slice(data.indices());

        let vertex_array = device.create_vertex_array()?;
        self.vertex_array = Some(vertex_array);
        device.bind_vertex_array(Some(vertex_array));

        self.vertex_buffer = Some(device.create_buffer(BufferTarget::Array, vertex_bytes)?);
        self.index_buffer = Some(device.create_buffer(BufferTarget::Element, index_bytes)?);
        self.index_count = data.index_count();

        let stride = layout.record_size();
        for attribute in layout.attributes() {
            device.vertex_attribute(attribute, stride);
        }

        // The vertex array keeps its element buffer; unbind it first
        device.bind_vertex_array(None);
        device.bind_buffer(BufferTarget::Array, None);
        device.bind_buffer(BufferTarget::Element, None);

        debug!(
            "uploaded {} mesh: {} vertices ({} bytes), {} indices",
            layout,
            data.vertex_count(),
            vertex_bytes.len(),
            self.index_count
        );
        Ok(())
    }

    /// Delete whatever resources are held and reset the handles; safe to repeat
    pub fn release<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D) {
        if let Some(id) = self.vertex_array.take() {
            device.delete_vertex_array(id);
        }
        if let Some(id) = self.vertex_buffer.take() {
            device.delete_buffer(id);
        }
        if let Some(id) = self.index_buffer.take() {
            device.delete_buffer(id);
        }
        self.index_count = 0;
    }

    /// Issue the indexed triangle draw for this mesh
    ///
    /// Without a vertex array or vertex buffer nothing is drawn and
    /// `UnboundResource` is returned. Without an index buffer,
    /// `3 * index_count` vertices are drawn in order instead.
    pub fn draw<D: GraphicsDevice + ?Sized>(&self, device: &mut D) -> Result<()> {
        let Some(vertex_array) = self.vertex_array else {
            warn!("render skipped: vertex array does not exist");
            return Err(Error::UnboundResource);
        };
        if self.vertex_buffer.is_none() {
            warn!("render skipped: vertex buffer does not exist");
            return Err(Error::UnboundResource);
        }

        device.bind_vertex_array(Some(vertex_array));
        device.bind_buffer(BufferTarget::Element, self.index_buffer);

        if self.index_buffer.is_some() {
            device.draw_elements(self.index_count);
        } else {
            device.draw_arrays(3 * self.index_count);
        }

        device.bind_vertex_array(None);
        device.bind_buffer(BufferTarget::Element, None);
        Ok(())
    }

    pub fn is_uploaded(&self) -> bool {
        self.vertex_array.is_some() && self.vertex_buffer.is_some()
    }

    pub fn vertex_array(&self) -> Option<VertexArrayId> {
        self.vertex_array
    }

    pub fn vertex_buffer(&self) -> Option<BufferId> {
        self.vertex_buffer
    }

    pub fn index_buffer(&self) -> Option<BufferId> {
        self.index_buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{ProgramId, ShaderId, ShaderStage};
    use crate::geometry::RawOptions;
    use crate::headless::{DrawCall, HeadlessDevice};
    use crate::vertex::{VertexAttribute, VertexLayout};

    fn triangle_data(layout: VertexLayout) -> MeshData {
        let stride = layout.stride_floats();
        let floats: Vec<f32> = (0..stride * 3).map(|i| i as f32 * 0.5).collect();
        MeshData::from_raw(&floats, &[0, 1, 2], layout, &RawOptions::default()).unwrap()
    }

    #[test]
    fn test_upload_registers_layout_contract() {
        for layout in [VertexLayout::Base, VertexLayout::Standard, VertexLayout::Full] {
            let mut device = HeadlessDevice::new();
            let data = triangle_data(layout);
            let gpu = GpuMesh::upload(&mut device, &data).unwrap();

            let vbo = gpu.vertex_buffer().unwrap();
            assert_eq!(device.buffer(vbo).unwrap().len(), layout.record_size() * 3);
            assert_eq!(device.buffer(vbo).unwrap(), data.vertices().as_bytes());
            let ebo = gpu.index_buffer().unwrap();
            assert_eq!(device.indices(ebo), Some(vec![0, 1, 2]));

            let state = device.vertex_array(gpu.vertex_array().unwrap()).unwrap();
            assert_eq!(state.element_buffer, Some(ebo));
            assert_eq!(state.attributes.len(), layout.attributes().len());
            for attribute in layout.attributes() {
                let binding = state.attributes[&attribute.location];
                assert_eq!(binding.buffer, vbo);
                assert_eq!(binding.components, attribute.components);
                assert_eq!(binding.offset, attribute.offset);
                assert_eq!(binding.stride, layout.record_size());
                assert!(!binding.normalized);
            }
            assert_eq!(device.bound_vertex_array(), None);
        }
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut device = HeadlessDevice::new();
        let mut gpu = GpuMesh::upload(&mut device, &triangle_data(VertexLayout::Base)).unwrap();
        assert_eq!(device.live_mesh_resources(), 3);

        gpu.release(&mut device);
        gpu.release(&mut device);
        assert_eq!(device.live_mesh_resources(), 0);
        assert_eq!(gpu, GpuMesh::default());
    }

    #[test]
    fn test_draw_without_upload_is_skipped() {
        let mut device = HeadlessDevice::new();
        let gpu = GpuMesh::default();
        assert!(matches!(gpu.draw(&mut device), Err(Error::UnboundResource)));
        assert!(device.draws().is_empty());
    }

    #[test]
    fn test_draw_issues_indexed_triangles() {
        let mut device = HeadlessDevice::new();
        let gpu = GpuMesh::upload(&mut device, &triangle_data(VertexLayout::Standard)).unwrap();
        gpu.draw(&mut device).unwrap();

        assert_eq!(
            device.draws(),
            &[DrawCall::Elements {
                vertex_array: gpu.vertex_array().unwrap(),
                element_buffer: gpu.index_buffer().unwrap(),
                index_count: 3,
                program: None,
            }]
        );
    }

    #[test]
    fn test_draw_without_index_buffer_falls_back_to_arrays() {
        let mut device = HeadlessDevice::new();
        let mut gpu = GpuMesh::upload(&mut device, &triangle_data(VertexLayout::Base)).unwrap();
        let index_buffer = gpu.index_buffer.take().unwrap();
        device.delete_buffer(index_buffer);

        gpu.draw(&mut device).unwrap();
        assert_eq!(
            device.draws(),
            &[DrawCall::Arrays {
                vertex_array: gpu.vertex_array().unwrap(),
                vertex_count: 9,
                program: None,
            }]
        );
        gpu.release(&mut device);
        assert_eq!(device.live_mesh_resources(), 0);
    }

    /// Fails the index buffer allocation to exercise cleanup
    struct FailingDevice {
        inner: HeadlessDevice,
        buffers_before_failure: usize,
    }

    impl GraphicsDevice for FailingDevice {
        fn create_vertex_array(&mut self) -> Result<VertexArrayId> {
            self.inner.create_vertex_array()
        }
        fn delete_vertex_array(&mut self, id: VertexArrayId) {
            self.inner.delete_vertex_array(id)
        }
        fn bind_vertex_array(&mut self, id: Option<VertexArrayId>) {
            self.inner.bind_vertex_array(id)
        }
        fn create_buffer(&mut self, target: BufferTarget, data: &[u8]) -> Result<BufferId> {
            if self.buffers_before_failure == 0 {
                return Err(Error::Device("out of memory".to_string()));
            }
            self.buffers_before_failure -= 1;
            self.inner.create_buffer(target, data)
        }
        fn delete_buffer(&mut self, id: BufferId) {
            self.inner.delete_buffer(id)
        }
        fn bind_buffer(&mut self, target: BufferTarget, id: Option<BufferId>) {
            self.inner.bind_buffer(target, id)
        }
        fn vertex_attribute(&mut self, attribute: &VertexAttribute, stride: usize) {
            self.inner.vertex_attribute(attribute, stride)
        }
        fn draw_elements(&mut self, index_count: usize) {
            self.inner.draw_elements(index_count)
        }
        fn draw_arrays(&mut self, vertex_count: usize) {
            self.inner.draw_arrays(vertex_count)
        }
        fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId> {
            self.inner.compile_shader(stage, source)
        }
        fn delete_shader(&mut self, id: ShaderId) {
            self.inner.delete_shader(id)
        }
        fn link_program(&mut self, shaders: &[ShaderId]) -> Result<ProgramId> {
            self.inner.link_program(shaders)
        }
        fn delete_program(&mut self, id: ProgramId) {
            self.inner.delete_program(id)
        }
        fn use_program(&mut self, id: Option<ProgramId>) {
            self.inner.use_program(id)
        }
    }

    #[test]
    fn test_failed_upload_releases_partial_resources() {
        let mut device = FailingDevice {
            inner: HeadlessDevice::new(),
            buffers_before_failure: 1,
        };
        let result = GpuMesh::upload(&mut device, &triangle_data(VertexLayout::Base));
        assert!(matches!(result, Err(Error::Device(_))));
        assert_eq!(device.inner.live_mesh_resources(), 0);
    }
}
