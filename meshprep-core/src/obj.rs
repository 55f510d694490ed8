/// Wavefront OBJ and MTL parsing into flat per-shape arrays
///
/// Each shape comes out the way a renderer wants to consume it: one vertex per
/// unique position/texcoord/normal combination, flat `positions` (xyz),
/// `normals` (xyz) and `texcoords` (uv) arrays of matching length, and a
/// triangle list of indices into them. Polygons are fan-triangulated.
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use nom::{
    character::complete::{char, i64 as signed, space1},
    combinator::{all_consuming, opt},
    multi::separated_list1,
    number::complete::float,
    sequence::preceded,
    IResult,
};

use crate::error::{Error, Result};

/// One named group of triangles with its own vertex arrays
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjShape {
    pub name: String,
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub texcoords: Vec<f32>,
    pub indices: Vec<u32>,
    /// Index into `ObjScene::materials`
    pub material_id: Option<usize>,
}

impl ObjShape {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub ambient: [f32; 3],
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    pub shininess: f32,
    pub dissolve: f32,
    pub diffuse_texture: Option<String>,
    pub specular_texture: Option<String>,
    pub normal_texture: Option<String>,
    pub alpha_texture: Option<String>,
}

impl Material {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ambient: [0.0; 3],
            diffuse: [0.0; 3],
            specular: [0.0; 3],
            shininess: 1.0,
            dissolve: 1.0,
            diffuse_texture: None,
            specular_texture: None,
            normal_texture: None,
            alpha_texture: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjScene {
    pub shapes: Vec<ObjShape>,
    pub materials: Vec<Material>,
}

/// Read an OBJ file, and its material libraries when `load_materials` is set
///
/// Material libraries are resolved relative to the OBJ file's directory. A
/// library that cannot be read is reported and skipped.
pub fn load_obj(path: &Path, load_materials: bool) -> Result<ObjScene> {
    let load_error = |message: String| Error::FileLoad {
        path: path.to_path_buf(),
        message,
    };

    let text = fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
    let parsed = parse_obj(&text).map_err(load_error)?;

    let mut materials = Vec::new();
    if load_materials {
        let folder = path.parent().map(Path::to_path_buf).unwrap_or_default();
        for library in &parsed.material_libraries {
            let library_path: PathBuf = folder.join(library);
            match fs::read_to_string(&library_path) {
                Ok(text) => match parse_mtl(&text) {
                    Ok(mut parsed) => materials.append(&mut parsed),
                    Err(e) => warn!("ignoring material library '{}': {}", library_path.display(), e),
                },
                Err(e) => warn!("cannot read material library '{}': {}", library_path.display(), e),
            }
        }
    }

    let shapes = parsed
        .shapes
        .into_iter()
        .map(|shape| {
            let material_id = shape
                .material
                .as_deref()
                .and_then(|name| materials.iter().position(|m: &Material| m.name == name));
            if load_materials && shape.material.is_some() && material_id.is_none() {
                warn!("shape '{}' uses an unknown material", shape.shape.name);
            }
            ObjShape {
                material_id,
                ..shape.shape
            }
        })
        .collect::<Vec<_>>();

    debug!(
        "loaded '{}': {} shapes, {} materials",
        path.display(),
        shapes.len(),
        materials.len()
    );

    Ok(ObjScene { shapes, materials })
}

/// Shapes with unresolved material names, plus the libraries the file asked for
#[derive(Debug, Default)]
pub struct ParsedObj {
    pub shapes: Vec<NamedShape>,
    pub material_libraries: Vec<String>,
}

#[derive(Debug)]
pub struct NamedShape {
    pub shape: ObjShape,
    pub material: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct FaceVertex {
    position: i64,
    texcoord: Option<i64>,
    normal: Option<i64>,
}

#[derive(Debug, PartialEq)]
enum Statement<'a> {
    Position([f32; 3]),
    TexCoord([f32; 2]),
    Normal([f32; 3]),
    Face(Vec<FaceVertex>),
    Group(&'a str),
    MaterialLib(&'a str),
    UseMaterial(&'a str),
    Ignored,
}

/// Parse OBJ text without touching the filesystem
pub fn parse_obj(input: &str) -> std::result::Result<ParsedObj, String> {
    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut texcoords: Vec<[f32; 2]> = Vec::new();
    let mut normals: Vec<[f32; 3]> = Vec::new();

    let mut parsed = ParsedObj::default();
    let mut builder = ShapeBuilder::new("");

    for (number, line) in input.lines().enumerate() {
        let line = strip_comment(line);
        if line.is_empty() {
            continue;
        }

        let statement = parse_statement(line)
            .map_err(|e| format!("line {}: cannot parse '{}': {}", number + 1, line, e))?;

        match statement {
            Statement::Position(p) => positions.push(p),
            Statement::TexCoord(t) => texcoords.push(t),
            Statement::Normal(n) => normals.push(n),
            Statement::Face(face) => {
                if face.len() < 3 {
                    return Err(format!("line {}: face needs at least 3 vertices", number + 1));
                }
                let mut resolved = Vec::with_capacity(face.len());
                for vertex in &face {
                    let key = resolve(vertex, positions.len(), texcoords.len(), normals.len())
                        .map_err(|e| format!("line {}: {}", number + 1, e))?;
                    resolved.push(builder.vertex(key, &positions, &texcoords, &normals));
                }
                // Fan triangulation
                for k in 1..resolved.len() - 1 {
                    builder.triangle([resolved[0], resolved[k], resolved[k + 1]]);
                }
            }
            Statement::Group(name) => {
                let material = builder.material.clone();
                builder.finish_into(&mut parsed.shapes);
                builder = ShapeBuilder::new(name);
                builder.material = material;
            }
            Statement::MaterialLib(libraries) => {
                parsed
                    .material_libraries
                    .extend(libraries.split_whitespace().map(str::to_string));
            }
            Statement::UseMaterial(name) => {
                if builder.has_faces() && builder.material.as_deref() != Some(name) {
                    let shape_name = builder.name.clone();
                    builder.finish_into(&mut parsed.shapes);
                    builder = ShapeBuilder::new(&shape_name);
                }
                builder.material = Some(name.to_string());
            }
            Statement::Ignored => {}
        }
    }
    builder.finish_into(&mut parsed.shapes);

    Ok(parsed)
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(at) => line[..at].trim(),
        None => line.trim(),
    }
}

fn parse_statement(line: &str) -> std::result::Result<Statement<'_>, String> {
    let (keyword, arguments) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let arguments = arguments.trim_start();

    let parsed = match keyword {
        "v" => floats3(arguments).map(|(_, p)| Statement::Position(p)),
        "vt" => texcoord(arguments).map(|(_, t)| Statement::TexCoord(t)),
        "vn" => floats3(arguments).map(|(_, n)| Statement::Normal(n)),
        "f" => all_consuming(separated_list1(space1, face_vertex))(arguments).map(|(_, f)| Statement::Face(f)),
        "o" | "g" => return Ok(Statement::Group(arguments)),
        "mtllib" => return Ok(Statement::MaterialLib(arguments)),
        "usemtl" => return Ok(Statement::UseMaterial(arguments)),
        _ => return Ok(Statement::Ignored),
    };
    parsed.map_err(|e| format!("{:?}", e))
}

fn floats3(input: &str) -> IResult<&str, [f32; 3]> {
    let (input, x) = float(input)?;
    let (input, y) = preceded(space1, float)(input)?;
    let (input, z) = preceded(space1, float)(input)?;
    Ok((input, [x, y, z]))
}

/// `u [v [w]]`, v defaults to zero
fn texcoord(input: &str) -> IResult<&str, [f32; 2]> {
    let (input, u) = float(input)?;
    let (input, v) = opt(preceded(space1, float))(input)?;
    Ok((input, [u, v.unwrap_or(0.0)]))
}

/// `p`, `p/t`, `p//n` or `p/t/n`
fn face_vertex(input: &str) -> IResult<&str, FaceVertex> {
    let (input, position) = signed(input)?;
    let (input, texcoord) = opt(preceded(char('/'), opt(signed)))(input)?;
    let (input, normal) = opt(preceded(char('/'), signed))(input)?;
    Ok((
        input,
        FaceVertex {
            position,
            texcoord: texcoord.flatten(),
            normal,
        },
    ))
}

/// Turn 1-based (or negative, relative) OBJ indices into 0-based ones
fn resolve(
    vertex: &FaceVertex,
    positions: usize,
    texcoords: usize,
    normals: usize,
) -> std::result::Result<VertexKey, String> {
    fn absolute(index: i64, count: usize, what: &str) -> std::result::Result<usize, String> {
        let resolved = if index > 0 {
            index - 1
        } else {
            count as i64 + index
        };
        if index == 0 || resolved < 0 || resolved >= count as i64 {
            return Err(format!("{} index {} out of range ({} defined)", what, index, count));
        }
        Ok(resolved as usize)
    }

    Ok(VertexKey {
        position: absolute(vertex.position, positions, "position")?,
        texcoord: vertex
            .texcoord
            .map(|t| absolute(t, texcoords, "texcoord"))
            .transpose()?,
        normal: vertex
            .normal
            .map(|n| absolute(n, normals, "normal"))
            .transpose()?,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct VertexKey {
    position: usize,
    texcoord: Option<usize>,
    normal: Option<usize>,
}

struct ShapeBuilder {
    name: String,
    material: Option<String>,
    keys: Vec<VertexKey>,
    lookup: HashMap<VertexKey, u32>,
    indices: Vec<u32>,
    positions: Vec<f32>,
    texcoords: Vec<f32>,
    normals: Vec<f32>,
}

impl ShapeBuilder {
    fn new(name: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            material: None,
            keys: Vec::new(),
            lookup: HashMap::new(),
            indices: Vec::new(),
            positions: Vec::new(),
            texcoords: Vec::new(),
            normals: Vec::new(),
        }
    }

    fn has_faces(&self) -> bool {
        !self.indices.is_empty()
    }

    fn vertex(&mut self, key: VertexKey, positions: &[[f32; 3]], texcoords: &[[f32; 2]], normals: &[[f32; 3]]) -> u32 {
        if let Some(&index) = self.lookup.get(&key) {
            return index;
        }
        let index = self.keys.len() as u32;
        self.keys.push(key);
        self.lookup.insert(key, index);
        self.positions.extend_from_slice(&positions[key.position]);
        self.texcoords
            .extend_from_slice(&key.texcoord.map_or([0.0; 2], |t| texcoords[t]));
        self.normals
            .extend_from_slice(&key.normal.map_or([0.0; 3], |n| normals[n]));
        index
    }

    fn triangle(&mut self, corners: [u32; 3]) {
        self.indices.extend_from_slice(&corners);
    }

    /// Push the shape if it has faces; attribute arrays nothing referenced are left empty
    fn finish_into(self, shapes: &mut Vec<NamedShape>) {
        if !self.has_faces() {
            return;
        }
        let any_texcoords = self.keys.iter().any(|k| k.texcoord.is_some());
        let any_normals = self.keys.iter().any(|k| k.normal.is_some());
        shapes.push(NamedShape {
            shape: ObjShape {
                name: self.name,
                positions: self.positions,
                normals: if any_normals { self.normals } else { Vec::new() },
                texcoords: if any_texcoords { self.texcoords } else { Vec::new() },
                indices: self.indices,
                material_id: None,
            },
            material: self.material,
        });
    }
}

/// Parse MTL text into its materials
pub fn parse_mtl(input: &str) -> std::result::Result<Vec<Material>, String> {
    let mut materials: Vec<Material> = Vec::new();

    for (number, line) in input.lines().enumerate() {
        let line = strip_comment(line);
        if line.is_empty() {
            continue;
        }
        let (keyword, arguments) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let arguments = arguments.trim();

        if keyword == "newmtl" {
            materials.push(Material::named(arguments));
            continue;
        }
        let Some(material) = materials.last_mut() else {
            return Err(format!("line {}: '{}' before any newmtl", number + 1, keyword));
        };

        let bad_line = |_| format!("line {}: cannot parse '{}'", number + 1, line);
        match keyword {
            "Ka" => material.ambient = color(arguments).map_err(bad_line)?.1,
            "Kd" => material.diffuse = color(arguments).map_err(bad_line)?.1,
            "Ks" => material.specular = color(arguments).map_err(bad_line)?.1,
            "Ns" => material.shininess = float::<_, ()>(arguments).map_err(bad_line)?.1,
            "d" => material.dissolve = float::<_, ()>(arguments).map_err(bad_line)?.1,
            "Tr" => material.dissolve = 1.0 - float::<_, ()>(arguments).map_err(bad_line)?.1,
            "map_Kd" => material.diffuse_texture = texture_name(arguments),
            "map_Ks" => material.specular_texture = texture_name(arguments),
            "map_Bump" | "map_bump" | "bump" | "norm" => material.normal_texture = texture_name(arguments),
            "map_d" => material.alpha_texture = texture_name(arguments),
            _ => {}
        }
    }

    Ok(materials)
}

/// `r g b`, or a single value used for all three channels; any other count is rejected
fn color(input: &str) -> IResult<&str, [f32; 3], ()> {
    if let Ok((remaining, rgb)) = all_consuming(floats3)(input) {
        return Ok((remaining, rgb));
    }
    let (remaining, r) = all_consuming(float::<_, ()>)(input)?;
    Ok((remaining, [r, r, r]))
}

/// Texture statements may carry options (`-bm 0.5 normal.png`); the file name comes last
fn texture_name(arguments: &str) -> Option<String> {
    arguments.split_whitespace().last().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const QUAD: &str = "\
# textured quad
mtllib quad.mtl
o Quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
usemtl brick
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    #[test]
    fn test_parse_quad_fan() {
        let parsed = parse_obj(QUAD).unwrap();
        assert_eq!(parsed.material_libraries, vec!["quad.mtl".to_string()]);
        assert_eq!(parsed.shapes.len(), 1);

        let named = &parsed.shapes[0];
        assert_eq!(named.material.as_deref(), Some("brick"));
        let shape = &named.shape;
        assert_eq!(shape.name, "Quad");
        assert_eq!(shape.vertex_count(), 4);
        assert_eq!(shape.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(shape.texcoords, vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0]);
        assert_eq!(shape.normals.len(), 12);
        assert_eq!(&shape.normals[9..12], &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_face_vertex_forms() {
        assert_eq!(
            face_vertex("3").unwrap().1,
            FaceVertex { position: 3, texcoord: None, normal: None }
        );
        assert_eq!(
            face_vertex("3/4").unwrap().1,
            FaceVertex { position: 3, texcoord: Some(4), normal: None }
        );
        assert_eq!(
            face_vertex("3//5").unwrap().1,
            FaceVertex { position: 3, texcoord: None, normal: Some(5) }
        );
        assert_eq!(
            face_vertex("-1/-2/-3").unwrap().1,
            FaceVertex { position: -1, texcoord: Some(-2), normal: Some(-3) }
        );
    }

    #[test]
    fn test_negative_indices_and_shared_vertices() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\nf -4 -3 -2\nf -3 -1 -2\n";
        let parsed = parse_obj(text).unwrap();
        let shape = &parsed.shapes[0].shape;
        assert_eq!(shape.vertex_count(), 4);
        assert_eq!(shape.indices, vec![0, 1, 2, 1, 3, 2]);
        assert!(shape.normals.is_empty());
        assert!(shape.texcoords.is_empty());
    }

    #[test]
    fn test_groups_split_shapes() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\ng first\nf 1 2 3\ng second\nf 3 2 1\ng empty\n";
        let parsed = parse_obj(text).unwrap();
        let names: Vec<_> = parsed.shapes.iter().map(|s| s.shape.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(parsed.shapes[1].shape.indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_material_switch_splits_shape() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\no box\nusemtl a\nf 1 2 3\nusemtl b\nf 1 3 2\n";
        let parsed = parse_obj(text).unwrap();
        assert_eq!(parsed.shapes.len(), 2);
        assert_eq!(parsed.shapes[0].material.as_deref(), Some("a"));
        assert_eq!(parsed.shapes[1].material.as_deref(), Some("b"));
        assert_eq!(parsed.shapes[1].shape.name, "box");
    }

    #[test]
    fn test_bad_index_is_reported_with_line() {
        let err = parse_obj("v 0 0 0\nf 1 2 3\n").unwrap_err();
        assert!(err.starts_with("line 2:"), "{}", err);

        let err = parse_obj("v 0 0 0\nf 1 x 3\n").unwrap_err();
        assert!(err.starts_with("line 2:"), "{}", err);
    }

    #[test]
    fn test_parse_mtl() {
        let text = "\
newmtl brick
Ka 0.1 0.1 0.1
Kd 0.8 0.4 0.2
Ns 32
d 0.5
map_Kd brick_diffuse.png
map_Bump -bm 0.8 brick_normal.png
newmtl plain
Kd 1
";
        let materials = parse_mtl(text).unwrap();
        assert_eq!(materials.len(), 2);
        assert_eq!(materials[0].diffuse, [0.8, 0.4, 0.2]);
        assert_eq!(materials[0].shininess, 32.0);
        assert_eq!(materials[0].dissolve, 0.5);
        assert_eq!(materials[0].diffuse_texture.as_deref(), Some("brick_diffuse.png"));
        assert_eq!(materials[0].normal_texture.as_deref(), Some("brick_normal.png"));
        assert_eq!(materials[1].diffuse, [1.0, 1.0, 1.0]);

        assert!(parse_mtl("Kd 1 1 1\n").is_err());
    }

    #[test]
    fn test_mtl_color_needs_one_or_three_values() {
        let err = parse_mtl("newmtl a\nKd 0.8 0.4\n").unwrap_err();
        assert!(err.contains("line 2"), "{}", err);
        assert!(parse_mtl("newmtl a\nKs 0.1 0.2 0.3 0.4\n").is_err());
        assert!(parse_mtl("newmtl a\nKa 0.5 red\n").is_err());

        let materials = parse_mtl("newmtl a\nKs 0.25\nKa 0.1 0.2 0.3\n").unwrap();
        assert_eq!(materials[0].specular, [0.25, 0.25, 0.25]);
        assert_eq!(materials[0].ambient, [0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_load_obj_with_companion_mtl() {
        let dir = tempfile::tempdir().unwrap();
        let obj_path = dir.path().join("quad.obj");
        fs::File::create(&obj_path)
            .unwrap()
            .write_all(QUAD.as_bytes())
            .unwrap();
        fs::write(dir.path().join("quad.mtl"), "newmtl brick\nKd 1 0 0\n").unwrap();

        let scene = load_obj(&obj_path, true).unwrap();
        assert_eq!(scene.materials.len(), 1);
        assert_eq!(scene.shapes[0].material_id, Some(0));

        let scene = load_obj(&obj_path, false).unwrap();
        assert!(scene.materials.is_empty());
        assert_eq!(scene.shapes[0].material_id, None);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_obj(Path::new("/nonexistent/model.obj"), true).unwrap_err();
        assert!(matches!(err, Error::FileLoad { .. }));
    }
}
