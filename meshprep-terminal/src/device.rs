/// A software `GraphicsDevice` that rasterizes draw calls into the ASCII framebuffer
use log::warn;
use meshprep_core::{
    BufferId, BufferTarget, GraphicsDevice, HeadlessDevice, ProgramId, Result, ShaderId, ShaderStage,
    VertexArrayId, VertexAttribute,
};
use nalgebra::{Matrix4, Point3, Vector3};

use crate::renderer::{AsciiRenderer, ScreenPoint};
use crate::view::Camera;

const POSITION_LOCATION: u32 = 0;

/// Resource bookkeeping is delegated to a `HeadlessDevice`; draws additionally
/// read positions back through the bound vertex array's attribute contract.
pub struct AsciiDevice {
    inner: HeadlessDevice,
    renderer: AsciiRenderer,
    camera: Camera,
    model: Matrix4<f32>,
    light: Vector3<f32>,
}

impl AsciiDevice {
    pub fn new(columns: u16, rows: u16, camera: Camera) -> Self {
        Self {
            inner: HeadlessDevice::new(),
            renderer: AsciiRenderer::new(columns as usize, rows as usize),
            camera,
            model: Matrix4::identity(),
            light: Vector3::new(0.3, 0.5, 1.0).normalize(),
        }
    }

    /// Clear the framebuffer and the recorded draw log
    pub fn begin_frame(&mut self, model: Matrix4<f32>) {
        self.model = model;
        self.renderer.clear();
        self.inner.take_draws();
    }

    pub fn resize(&mut self, columns: u16, rows: u16) {
        self.camera.resize(columns, rows);
        self.renderer.resize(columns as usize, rows as usize);
    }

    pub fn renderer(&self) -> &AsciiRenderer {
        &self.renderer
    }

    pub fn headless(&self) -> &HeadlessDevice {
        &self.inner
    }

    fn position(&self, vertex_array: VertexArrayId, vertex: u32) -> Option<Point3<f32>> {
        let components = self
            .inner
            .fetch_attribute(vertex_array, POSITION_LOCATION, vertex as usize)?;
        match components.as_slice() {
            [x, y, z, ..] => Some(Point3::new(*x, *y, *z)),
            _ => None,
        }
    }

    fn rasterize(&mut self, vertex_array: VertexArrayId, triangles: impl Iterator<Item = [u32; 3]>) {
        let (columns, rows) = self.renderer.size();
        'triangles: for triangle in triangles {
            let mut world = [Point3::origin(); 3];
            for (slot, &vertex) in world.iter_mut().zip(&triangle) {
                let Some(position) = self.position(vertex_array, vertex) else {
                    warn!("vertex {} has no readable position; skipping triangle", vertex);
                    continue 'triangles;
                };
                *slot = self.model.transform_point(&position);
            }

            let normal = (world[1] - world[0]).cross(&(world[2] - world[0]));
            let brightness = match normal.try_normalize(1e-12) {
                Some(normal) => normal.dot(&self.light).abs(),
                None => continue,
            };

            let mut screen: [ScreenPoint; 3] = [(0.0, 0.0, 0.0); 3];
            let visible = world.iter().zip(screen.iter_mut()).all(|(point, slot)| {
                match self.camera.project(point, columns, rows) {
                    Some(projected) => {
                        *slot = projected;
                        true
                    }
                    None => false,
                }
            });
            if visible {
                self.renderer.fill_triangle(screen, brightness);
            }
        }
    }
}

impl GraphicsDevice for AsciiDevice {
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
        self.inner.draw_elements(index_count);
        let Some(vertex_array) = self.inner.bound_vertex_array() else {
            return;
        };
        let Some(indices) = self
            .inner
            .vertex_array(vertex_array)
            .and_then(|state| state.element_buffer)
            .and_then(|buffer| self.inner.indices(buffer))
        else {
            return;
        };
        let count = index_count.min(indices.len());
        let triangles = indices[..count].chunks_exact(3).map(|t| [t[0], t[1], t[2]]).collect::<Vec<_>>();
        self.rasterize(vertex_array, triangles.into_iter());
    }

    fn draw_arrays(&mut self, vertex_count: usize) {
        self.inner.draw_arrays(vertex_count);
        let Some(vertex_array) = self.inner.bound_vertex_array() else {
            return;
        };
        let triangles = (0..(vertex_count / 3) as u32).map(|t| [t * 3, t * 3 + 1, t * 3 + 2]);
        self.rasterize(vertex_array, triangles);
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
