/// Keyed ownership of compiled shaders and linked programs
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::{debug, warn};

use crate::device::{GraphicsDevice, ProgramId, ShaderId, ShaderStage};
use crate::error::{Error, KeyKind, Result};

/// Maps string keys to the shader and program handles it owns
///
/// Not safe for concurrent registration: the duplicate check and the insert
/// are separate steps.
#[derive(Debug, Default)]
pub struct ShaderRegistry {
    shaders: HashMap<String, ShaderId>,
    programs: HashMap<String, ProgramId>,
}

impl ShaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `path` and compile it under `key`
    pub fn load<D: GraphicsDevice + ?Sized>(
        &mut self,
        device: &mut D,
        key: &str,
        stage: ShaderStage,
        path: &Path,
    ) -> Result<ShaderId> {
        self.check_free(KeyKind::Shader, key)?;
        let source = fs::read_to_string(path).map_err(|e| Error::FileLoad {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        self.load_source(device, key, stage, &source)
    }

    pub fn load_source<D: GraphicsDevice + ?Sized>(
        &mut self,
        device: &mut D,
        key: &str,
        stage: ShaderStage,
        source: &str,
    ) -> Result<ShaderId> {
        self.check_free(KeyKind::Shader, key)?;
        let id = device.compile_shader(stage, source)?;
        debug!("compiled {:?} shader '{}'", stage, key);
        self.shaders.insert(key.to_string(), id);
        Ok(id)
    }

    /// Link the shaders named by `shader_keys` into a program registered as `key`
    pub fn link<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D, key: &str, shader_keys: &[&str]) -> Result<ProgramId> {
        self.check_free(KeyKind::Program, key)?;

        let shaders = shader_keys
            .iter()
            .map(|&shader_key| {
                self.shaders.get(shader_key).copied().ok_or_else(|| {
                    warn!("program '{}' names unknown shader '{}'", key, shader_key);
                    Error::MissingKey {
                        kind: KeyKind::Shader,
                        key: shader_key.to_string(),
                    }
                })
            })
            .collect::<Result<Vec<_>>>()?;
        if shaders.is_empty() {
            warn!("program '{}' has no shaders", key);
            return Err(Error::EmptyLinkSet(key.to_string()));
        }

        let id = device.link_program(&shaders)?;
        debug!("linked program '{}' from {} shaders", key, shaders.len());
        self.programs.insert(key.to_string(), id);
        Ok(id)
    }

    /// Make the program registered as `key` current
    pub fn activate<D: GraphicsDevice + ?Sized>(&self, device: &mut D, key: &str) -> Result<()> {
        let Some(&id) = self.programs.get(key) else {
            warn!("cannot activate program '{}': not registered", key);
            return Err(Error::MissingKey {
                kind: KeyKind::Program,
                key: key.to_string(),
            });
        };
        device.use_program(Some(id));
        Ok(())
    }

    /// Delete every program and shader this registry owns
    pub fn clear<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D) {
        for (_, id) in self.programs.drain() {
            device.delete_program(id);
        }
        for (_, id) in self.shaders.drain() {
            device.delete_shader(id);
        }
    }

    pub fn shader(&self, key: &str) -> Option<ShaderId> {
        self.shaders.get(key).copied()
    }

    pub fn program(&self, key: &str) -> Option<ProgramId> {
        self.programs.get(key).copied()
    }

    pub fn contains_shader(&self, key: &str) -> bool {
        self.shaders.contains_key(key)
    }

    pub fn contains_program(&self, key: &str) -> bool {
        self.programs.contains_key(key)
    }

    fn check_free(&self, kind: KeyKind, key: &str) -> Result<()> {
        let taken = match kind {
            KeyKind::Shader => self.shaders.contains_key(key),
            KeyKind::Program => self.programs.contains_key(key),
        };
        if taken {
            warn!("{} key '{}' is already registered", kind, key);
            return Err(Error::DuplicateKey {
                kind,
                key: key.to_string(),
            });
        }
        Ok(())
    }
}
