/// A mesh that owns both its CPU-side data and its device resources
use std::path::Path;

use log::{info, warn};

use crate::binder::GpuMesh;
use crate::device::GraphicsDevice;
use crate::error::Result;
use crate::geometry::{LoadOptions, MeshData, RawOptions};
use crate::vertex::VertexLayout;

/// Release is explicit because it needs the device; dropping a mesh that
/// still holds handles only logs the leak.
#[derive(Debug, Default)]
pub struct Mesh {
    data: Option<MeshData>,
    gpu: GpuMesh,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_raw<D: GraphicsDevice + ?Sized>(
        device: &mut D,
        vertices: &[f32],
        indices: &[u32],
        layout: VertexLayout,
        options: &RawOptions,
    ) -> Result<Self> {
        let mut mesh = Self::new();
        mesh.load_raw(device, vertices, indices, layout, options)?;
        Ok(mesh)
    }

    pub fn from_file<D: GraphicsDevice + ?Sized>(device: &mut D, path: &Path, options: &LoadOptions) -> Result<Self> {
        let mut mesh = Self::new();
        mesh.load_file(device, path, options)?;
        Ok(mesh)
    }

    pub fn from_data<D: GraphicsDevice + ?Sized>(device: &mut D, data: MeshData) -> Result<Self> {
        let mut mesh = Self::new();
        mesh.load_data(device, data)?;
        Ok(mesh)
    }

    /// Rebuild from a flat float array; on error the mesh keeps its previous state
    pub fn load_raw<D: GraphicsDevice + ?Sized>(
        &mut self,
        device: &mut D,
        vertices: &[f32],
        indices: &[u32],
        layout: VertexLayout,
        options: &RawOptions,
    ) -> Result<()> {
        let data = MeshData::from_raw(vertices, indices, layout, options)?;
        self.load_data(device, data)
    }

    /// Rebuild from a scene file; on a parse error the mesh keeps its previous state
    pub fn load_file<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D, path: &Path, options: &LoadOptions) -> Result<()> {
        let data = MeshData::from_file(path, options)?;
        info!(
            "loaded '{}': {} vertices, {} indices, {} sub-meshes",
            path.display(),
            data.vertex_count(),
            data.index_count(),
            data.submeshes().len()
        );
        self.load_data(device, data)
    }

    /// Swap in finished data: the old resources go first, then the new data is uploaded
    ///
    /// If the upload itself fails the mesh is left empty.
    pub fn load_data<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D, data: MeshData) -> Result<()> {
        self.clear(device);
        self.gpu = GpuMesh::upload(device, &data)?;
        self.data = Some(data);
        Ok(())
    }

    /// Draw the mesh; an unpopulated mesh draws nothing and reports `UnboundResource`
    pub fn render<D: GraphicsDevice + ?Sized>(&self, device: &mut D) -> Result<()> {
        self.gpu.draw(device)
    }

    pub fn clear<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D) {
        self.gpu.release(device);
        self.data = None;
    }

    pub fn is_populated(&self) -> bool {
        self.data.is_some() && self.gpu.is_uploaded()
    }

    pub fn layout(&self) -> Option<VertexLayout> {
        self.data.as_ref().map(MeshData::layout)
    }

    pub fn vertex_count(&self) -> usize {
        self.data.as_ref().map_or(0, MeshData::vertex_count)
    }

    pub fn index_count(&self) -> usize {
        self.data.as_ref().map_or(0, MeshData::index_count)
    }

    pub fn data(&self) -> Option<&MeshData> {
        self.data.as_ref()
    }

    pub fn gpu(&self) -> &GpuMesh {
        &self.gpu
    }
}

impl Drop for Mesh {
    fn drop(&mut self) {
        if self.gpu.is_uploaded() || self.gpu.index_buffer().is_some() {
            warn!("mesh dropped while still holding device resources; call clear first");
        }
    }
}
