/// `GraphicsDevice` over the `gl` crate
///
/// Every method assumes a current OpenGL 3.3+ context whose function pointers
/// were loaded with `gl::load_with` before the device was created.
use std::ffi::CString;
use std::ptr;

use gl::types::*;
use log::debug;

use crate::device::{BufferId, BufferTarget, GraphicsDevice, ProgramId, ShaderId, ShaderStage, VertexArrayId};
use crate::error::{Error, Result};
use crate::vertex::{ComponentType, VertexAttribute};

#[derive(Debug)]
pub struct GlDevice {
    _private: (),
}

impl GlDevice {
    /// # Safety
    /// A context must be current on this thread with its functions loaded.
    pub unsafe fn new() -> Self {
        Self { _private: () }
    }
}

fn target_enum(target: BufferTarget) -> GLenum {
    match target {
        BufferTarget::Array => gl::ARRAY_BUFFER,
        BufferTarget::Element => gl::ELEMENT_ARRAY_BUFFER,
    }
}

fn stage_enum(stage: ShaderStage) -> GLenum {
    match stage {
        ShaderStage::Vertex => gl::VERTEX_SHADER,
        ShaderStage::Fragment => gl::FRAGMENT_SHADER,
        ShaderStage::Geometry => gl::GEOMETRY_SHADER,
    }
}

fn component_enum(component_type: ComponentType) -> GLenum {
    match component_type {
        ComponentType::F32 => gl::FLOAT,
    }
}

/// Read an info log of `len` bytes through `read`
fn info_log(len: GLint, read: impl FnOnce(GLsizei, *mut GLchar)) -> String {
    let mut buffer = vec![0u8; len.max(1) as usize];
    read(buffer.len() as GLsizei, buffer.as_mut_ptr() as *mut GLchar);
    let end = buffer.iter().position(|&b| b == 0).unwrap_or(buffer.len());
    String::from_utf8_lossy(&buffer[..end]).into_owned()
}

impl GraphicsDevice for GlDevice {
    fn create_vertex_array(&mut self) -> Result<VertexArrayId> {
        let mut id = 0;
        unsafe { gl::GenVertexArrays(1, &mut id) };
        if id == 0 {
            return Err(Error::Device("glGenVertexArrays returned no name".to_string()));
        }
        Ok(VertexArrayId(id))
    }

    fn delete_vertex_array(&mut self, id: VertexArrayId) {
        unsafe { gl::DeleteVertexArrays(1, &id.0) };
    }

    fn bind_vertex_array(&mut self, id: Option<VertexArrayId>) {
        unsafe { gl::BindVertexArray(id.map_or(0, |id| id.0)) };
    }

    fn create_buffer(&mut self, target: BufferTarget, data: &[u8]) -> Result<BufferId> {
        let mut id = 0;
        unsafe { gl::GenBuffers(1, &mut id) };
        if id == 0 {
            return Err(Error::Device("glGenBuffers returned no name".to_string()));
        }
        unsafe {
            gl::BindBuffer(target_enum(target), id);
            gl::BufferData(
                target_enum(target),
                data.len() as GLsizeiptr,
                data.as_ptr() as *const _,
                gl::STATIC_DRAW,
            );
            let error = gl::GetError();
            if error == gl::OUT_OF_MEMORY {
                gl::DeleteBuffers(1, &id);
                return Err(Error::Device(format!("out of memory uploading {} bytes", data.len())));
            }
        }
        Ok(BufferId(id))
    }

    fn delete_buffer(&mut self, id: BufferId) {
        unsafe { gl::DeleteBuffers(1, &id.0) };
    }

    fn bind_buffer(&mut self, target: BufferTarget, id: Option<BufferId>) {
        unsafe { gl::BindBuffer(target_enum(target), id.map_or(0, |id| id.0)) };
    }

    fn vertex_attribute(&mut self, attribute: &VertexAttribute, stride: usize) {
        unsafe {
            gl::EnableVertexAttribArray(attribute.location);
            gl::VertexAttribPointer(
                attribute.location,
                attribute.components as GLint,
                component_enum(attribute.component_type),
                if attribute.normalized { gl::TRUE } else { gl::FALSE },
                stride as GLsizei,
                attribute.offset as *const _,
            );
        }
    }

    fn draw_elements(&mut self, index_count: usize) {
        unsafe {
            gl::DrawElements(gl::TRIANGLES, index_count as GLsizei, gl::UNSIGNED_INT, ptr::null());
        }
    }

    fn draw_arrays(&mut self, vertex_count: usize) {
        unsafe { gl::DrawArrays(gl::TRIANGLES, 0, vertex_count as GLsizei) };
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId> {
        let source = CString::new(source.as_bytes()).map_err(|e| Error::ShaderCompile {
            stage,
            log: e.to_string(),
        })?;

        let shader = unsafe { gl::CreateShader(stage_enum(stage)) };
        let mut success = gl::FALSE as GLint;
        unsafe {
            gl::ShaderSource(shader, 1, &source.as_ptr(), ptr::null());
            gl::CompileShader(shader);
            gl::GetShaderiv(shader, gl::COMPILE_STATUS, &mut success);
        }

        if success != gl::TRUE as GLint {
            let mut len = 0;
            unsafe { gl::GetShaderiv(shader, gl::INFO_LOG_LENGTH, &mut len) };
            let log = info_log(len, |size, out| unsafe {
                gl::GetShaderInfoLog(shader, size, ptr::null_mut(), out)
            });
            unsafe { gl::DeleteShader(shader) };
            return Err(Error::ShaderCompile { stage, log });
        }

        debug!("compiled {:?} shader {}", stage, shader);
        Ok(ShaderId(shader))
    }

    fn delete_shader(&mut self, id: ShaderId) {
        unsafe { gl::DeleteShader(id.0) };
    }

    fn link_program(&mut self, shaders: &[ShaderId]) -> Result<ProgramId> {
        let program = unsafe { gl::CreateProgram() };
        let mut success = gl::FALSE as GLint;
        unsafe {
            for shader in shaders {
                gl::AttachShader(program, shader.0);
            }
            gl::LinkProgram(program);
            gl::GetProgramiv(program, gl::LINK_STATUS, &mut success);
            for shader in shaders {
                gl::DetachShader(program, shader.0);
            }
        }

        if success != gl::TRUE as GLint {
            let mut len = 0;
            unsafe { gl::GetProgramiv(program, gl::INFO_LOG_LENGTH, &mut len) };
            let log = info_log(len, |size, out| unsafe {
                gl::GetProgramInfoLog(program, size, ptr::null_mut(), out)
            });
            unsafe { gl::DeleteProgram(program) };
            return Err(Error::ProgramLink(log));
        }

        Ok(ProgramId(program))
    }

    fn delete_program(&mut self, id: ProgramId) {
        unsafe { gl::DeleteProgram(id.0) };
    }

    fn use_program(&mut self, id: Option<ProgramId>) {
        unsafe { gl::UseProgram(id.map_or(0, |id| id.0)) };
    }
}
