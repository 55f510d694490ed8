/// Example: build a mesh, register a shader program and record the draw
///
/// Usage: cargo run --example bind_shaders -- [path/to/file.obj]
use std::env;
use std::path::Path;

use meshprep_core::{HeadlessDevice, LoadOptions, Mesh, MeshData, ShaderRegistry, ShaderStage};

const VERTEX_SHADER: &str = r#"
#version 330 core
layout(location = 0) in vec4 position;
layout(location = 1) in vec4 normal;
layout(location = 2) in vec4 tangent;
layout(location = 3) in vec4 bitangent;
layout(location = 4) in vec2 tex_coord;
uniform mat4 mvp;
out mat3 tbn;
out vec2 uv;
void main() {
    tbn = mat3(tangent.xyz, bitangent.xyz, normal.xyz);
    uv = tex_coord;
    gl_Position = mvp * position;
}
"#;

const FRAGMENT_SHADER: &str = r#"
#version 330 core
in mat3 tbn;
in vec2 uv;
out vec4 color;
void main() {
    color = vec4(normalize(tbn[2]) * 0.5 + 0.5, 1.0);
}
"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();

    let mut device = HeadlessDevice::new();
    let mut mesh = match env::args().nth(1) {
        Some(path) => Mesh::from_file(&mut device, Path::new(&path), &LoadOptions::default())?,
        None => Mesh::from_data(&mut device, MeshData::cube(2.0))?,
    };

    let mut shaders = ShaderRegistry::new();
    shaders.load_source(&mut device, "normal_map.vert", ShaderStage::Vertex, VERTEX_SHADER)?;
    shaders.load_source(&mut device, "normal_map.frag", ShaderStage::Fragment, FRAGMENT_SHADER)?;
    shaders.link(&mut device, "normal_map", &["normal_map.vert", "normal_map.frag"])?;
    shaders.activate(&mut device, "normal_map")?;

    mesh.render(&mut device)?;
    for draw in device.draws() {
        println!("{:?}", draw);
    }

    mesh.clear(&mut device);
    shaders.clear(&mut device);
    println!(
        "live resources after teardown: {} mesh, {} shader",
        device.live_mesh_resources(),
        device.live_shader_resources()
    );
    Ok(())
}
