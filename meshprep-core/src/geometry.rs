/// CPU-side mesh data in one of the fixed vertex layouts
use std::path::Path;

use log::{debug, warn};
use nalgebra::{Vector2, Vector3};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::obj::{self, Material, ObjScene, ObjShape};
use crate::tangent::{calculate_tangents, IndexWalk, TangentOptions};
use crate::vertex::{
    BaseVertex, FullVertex, StandardVertex, VertexLayout, VertexRecord, Vertices,
};

/// Options for building from a flat float array
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawOptions {
    /// Overwrite the supplied tangent data of standard and full records
    pub generate_tangents: bool,
    pub tangents: TangentOptions,
}

/// Options for building from a scene file
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Read the companion material libraries
    pub load_textures: bool,
    /// Store `1 - v` instead of `v`
    pub flip_v: bool,
    pub tangents: TangentOptions,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            load_textures: true,
            flip_v: false,
            tangents: TangentOptions::default(),
        }
    }
}

/// A contiguous index range drawn with one material
#[derive(Debug, Clone, PartialEq)]
pub struct SubMesh {
    pub name: String,
    pub first_index: usize,
    pub index_count: usize,
    pub material_id: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    vertices: Vertices,
    indices: Vec<u32>,
    submeshes: Vec<SubMesh>,
    materials: Vec<Material>,
}

impl MeshData {
    /// Slice `floats` into records of `layout`
    ///
    /// The array length must be a non-zero multiple of the layout stride and
    /// every index must name one of the resulting records.
    pub fn from_raw(floats: &[f32], indices: &[u32], layout: VertexLayout, options: &RawOptions) -> Result<Self> {
        let stride = layout.stride_floats();
        if floats.is_empty() {
            return Err(Error::EmptyMesh);
        }
        if floats.len() % stride != 0 {
            return Err(Error::MalformedVertexData {
                len: floats.len(),
                stride,
            });
        }
        validate_indices(indices, floats.len() / stride)?;

        let vertices = match layout {
            VertexLayout::Base => Vertices::Base(read_records::<BaseVertex>(floats)),
            VertexLayout::Standard => {
                let mut records = read_records::<StandardVertex>(floats);
                if options.generate_tangents {
                    calculate_tangents(&mut records, indices, &options.tangents);
                }
                Vertices::Standard(records)
            }
            VertexLayout::Full => {
                let mut records = read_records::<FullVertex>(floats);
                if options.generate_tangents {
                    calculate_tangents(&mut records, indices, &options.tangents);
                }
                Vertices::Full(records)
            }
        };

        Ok(Self {
            vertices,
            indices: indices.to_vec(),
            submeshes: vec![SubMesh {
                name: String::new(),
                first_index: 0,
                index_count: indices.len(),
                material_id: None,
            }],
            materials: Vec::new(),
        })
    }

    /// Parse a scene file and build standard-layout data from all of its shapes
    pub fn from_file(path: &Path, options: &LoadOptions) -> Result<Self> {
        let scene = obj::load_obj(path, options.load_textures)?;
        Self::from_scene(scene, options)
    }

    /// Concatenate the scene's shapes into one standard-layout vertex/index sequence
    ///
    /// Each shape becomes a sub-mesh. Tangents are computed per shape, over its
    /// own vertices and local indices, when it has both normals and texture
    /// coordinates.
    pub fn from_scene(scene: ObjScene, options: &LoadOptions) -> Result<Self> {
        let mut vertices: Vec<StandardVertex> = Vec::new();
        let mut indices: Vec<u32> = Vec::new();
        let mut submeshes = Vec::with_capacity(scene.shapes.len());

        for shape in &scene.shapes {
            let count = shape.vertex_count();
            if count == 0 {
                warn!("shape '{}' has no positions, skipping", shape.name);
                continue;
            }
            validate_indices(&shape.indices, count)?;

            let base = vertices.len();
            let (has_normals, has_texcoords) = shape_attributes(shape, count);
            vertices.extend((0..count).map(|i| {
                let position = Vector3::new(
                    shape.positions[i * 3],
                    shape.positions[i * 3 + 1],
                    shape.positions[i * 3 + 2],
                );
                let normal = if has_normals {
                    Vector3::new(
                        shape.normals[i * 3],
                        shape.normals[i * 3 + 1],
                        shape.normals[i * 3 + 2],
                    )
                } else {
                    Vector3::zeros()
                };
                let tex_coord = if has_texcoords {
                    let v = shape.texcoords[i * 2 + 1];
                    Vector2::new(shape.texcoords[i * 2], if options.flip_v { 1.0 - v } else { v })
                } else {
                    Vector2::zeros()
                };
                StandardVertex::new(position, normal, tex_coord)
            }));

            if has_normals && has_texcoords {
                calculate_tangents(&mut vertices[base..], &shape.indices, &options.tangents);
            }

            submeshes.push(SubMesh {
                name: shape.name.clone(),
                first_index: indices.len(),
                index_count: shape.indices.len(),
                material_id: shape.material_id,
            });
            indices.extend(shape.indices.iter().map(|&i| i + base as u32));
        }

        if vertices.is_empty() {
            return Err(Error::EmptyMesh);
        }

        debug!(
            "built {} vertices and {} indices from {} shapes",
            vertices.len(),
            indices.len(),
            submeshes.len()
        );

        Ok(Self {
            vertices: Vertices::Standard(vertices),
            indices,
            submeshes,
            materials: scene.materials,
        })
    }

    /// An indexed standard-layout cube centred on the origin, one UV square per face
    pub fn cube(size: f32) -> Self {
        let half = size / 2.0;
        // (outward normal, direction of increasing u)
        let faces = [
            (Vector3::z(), Vector3::x()),
            (-Vector3::z(), -Vector3::x()),
            (Vector3::x(), -Vector3::z()),
            (-Vector3::x(), Vector3::z()),
            (Vector3::y(), Vector3::x()),
            (-Vector3::y(), Vector3::x()),
        ];
        let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, u_axis) in faces {
            let v_axis = normal.cross(&u_axis);
            let base = vertices.len() as u32;
            for (su, sv) in corners {
                let position = (normal + u_axis * su + v_axis * sv) * half;
                let tex_coord = Vector2::new((su + 1.0) / 2.0, (sv + 1.0) / 2.0);
                vertices.push(StandardVertex::new(position, normal, tex_coord));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        // Faces are disjoint triples; a sliding walk would mix neighbouring faces
        let options = TangentOptions {
            walk: IndexWalk::Triangles,
            ..Default::default()
        };
        calculate_tangents(&mut vertices, &indices, &options);

        Self {
            vertices: Vertices::Standard(vertices),
            submeshes: vec![SubMesh {
                name: "cube".to_string(),
                first_index: 0,
                index_count: indices.len(),
                material_id: None,
            }],
            indices,
            materials: Vec::new(),
        }
    }

    pub fn layout(&self) -> VertexLayout {
        self.vertices.layout()
    }

    pub fn vertices(&self) -> &Vertices {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn submeshes(&self) -> &[SubMesh] {
        &self.submeshes
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn standard_vertices(&self) -> Option<&[StandardVertex]> {
        match &self.vertices {
            Vertices::Standard(v) => Some(v),
            _ => None,
        }
    }
}

fn read_records<V: VertexRecord>(floats: &[f32]) -> Vec<V> {
    floats
        .chunks_exact(V::LAYOUT.stride_floats())
        .map(V::from_floats)
        .collect()
}

fn validate_indices(indices: &[u32], vertex_count: usize) -> Result<()> {
    match indices.iter().find(|&&i| i as usize >= vertex_count) {
        Some(&index) => Err(Error::IndexOutOfRange {
            index,
            vertex_count,
        }),
        None => Ok(()),
    }
}

/// Whether the shape's normal and texcoord arrays cover every vertex
fn shape_attributes(shape: &ObjShape, count: usize) -> (bool, bool) {
    let has_normals = shape.normals.len() == count * 3;
    let has_texcoords = shape.texcoords.len() == count * 2;
    if !shape.normals.is_empty() && !has_normals {
        warn!("shape '{}' has {} normal floats for {} vertices, ignoring normals", shape.name, shape.normals.len(), count);
    }
    if !shape.texcoords.is_empty() && !has_texcoords {
        warn!("shape '{}' has {} texcoord floats for {} vertices, ignoring texcoords", shape.name, shape.texcoords.len(), count);
    }
    (has_normals, has_texcoords)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequence(count: usize) -> Vec<f32> {
        (0..count).map(|i| i as f32 + 0.25).collect()
    }

    #[test]
    fn test_base_records_match_input() {
        let floats = sequence(12);
        let data = MeshData::from_raw(&floats, &[0, 1, 1], VertexLayout::Base, &RawOptions::default()).unwrap();
        let Vertices::Base(records) = data.vertices() else {
            panic!("expected base records");
        };
        assert_eq!(records.len(), 2);
        for (record, chunk) in records.iter().zip(floats.chunks(6)) {
            assert_eq!(&record.position[..], &chunk[0..3]);
            assert_eq!(&record.color[..], &chunk[3..6]);
        }
        assert_eq!(data.index_count(), 3);
    }

    #[test]
    fn test_standard_records_match_input() {
        let floats = sequence(36);
        let data = MeshData::from_raw(&floats, &[1, 0, 1], VertexLayout::Standard, &RawOptions::default()).unwrap();
        let records = data.standard_vertices().unwrap();
        assert_eq!(records.len(), 2);
        for (record, chunk) in records.iter().zip(floats.chunks(18)) {
            assert_eq!(&record.position[..], &chunk[0..4]);
            assert_eq!(&record.normal[..], &chunk[4..8]);
            assert_eq!(&record.tangent[..], &chunk[8..12]);
            assert_eq!(&record.bitangent[..], &chunk[12..16]);
            assert_eq!(&record.tex_coord[..], &chunk[16..18]);
        }
    }

    #[test]
    fn test_full_records_match_input() {
        let floats = sequence(57);
        let data = MeshData::from_raw(&floats, &[0, 1, 2], VertexLayout::Full, &RawOptions::default()).unwrap();
        let Vertices::Full(records) = data.vertices() else {
            panic!("expected full records");
        };
        assert_eq!(records.len(), 3);
        for (record, chunk) in records.iter().zip(floats.chunks(19)) {
            assert_eq!(&record.position[..], &chunk[0..3]);
            assert_eq!(&record.color[..], &chunk[3..6]);
            assert_eq!(&record.normal[..], &chunk[6..9]);
            assert_eq!(&record.tangent[..], &chunk[9..13]);
            assert_eq!(&record.tex_coords[0][..], &chunk[13..15]);
            assert_eq!(&record.tex_coords[1][..], &chunk[15..17]);
            assert_eq!(&record.tex_coords[2][..], &chunk[17..19]);
        }
    }

    #[test]
    fn test_raw_input_validation() {
        let options = RawOptions::default();
        assert!(matches!(
            MeshData::from_raw(&sequence(13), &[], VertexLayout::Base, &options),
            Err(Error::MalformedVertexData { len: 13, stride: 6 })
        ));
        assert!(matches!(
            MeshData::from_raw(&[], &[], VertexLayout::Full, &options),
            Err(Error::EmptyMesh)
        ));
        assert!(matches!(
            MeshData::from_raw(&sequence(12), &[0, 1, 2], VertexLayout::Base, &options),
            Err(Error::IndexOutOfRange { index: 2, vertex_count: 2 })
        ));
    }

    #[test]
    fn test_raw_tangent_generation_is_opt_in() {
        #[rustfmt::skip]
        let floats = [
            0.0, 0.0, 0.0, 1.0,  0.0, 0.0, 1.0, 0.0,  9.0, 9.0, 9.0, 9.0,  9.0, 9.0, 9.0, 9.0,  0.0, 0.0,
            1.0, 0.0, 0.0, 1.0,  0.0, 0.0, 1.0, 0.0,  9.0, 9.0, 9.0, 9.0,  9.0, 9.0, 9.0, 9.0,  1.0, 0.0,
            0.0, 1.0, 0.0, 1.0,  0.0, 0.0, 1.0, 0.0,  9.0, 9.0, 9.0, 9.0,  9.0, 9.0, 9.0, 9.0,  0.0, 1.0,
        ];
        let kept = MeshData::from_raw(&floats, &[0, 1, 2], VertexLayout::Standard, &RawOptions::default()).unwrap();
        assert_eq!(kept.standard_vertices().unwrap()[0].tangent, [9.0; 4]);

        let options = RawOptions {
            generate_tangents: true,
            ..Default::default()
        };
        let generated = MeshData::from_raw(&floats, &[0, 1, 2], VertexLayout::Standard, &options).unwrap();
        for vertex in generated.standard_vertices().unwrap() {
            assert_eq!(vertex.tangent, [1.0, 0.0, 0.0, 0.0]);
            assert_eq!(vertex.bitangent, [0.0, 1.0, 0.0, 0.0]);
        }
    }

    fn triangle_shape(name: &str, with_normals: bool) -> ObjShape {
        ObjShape {
            name: name.to_string(),
            positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            normals: if with_normals {
                vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0]
            } else {
                Vec::new()
            },
            texcoords: vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            indices: vec![0, 1, 2],
            material_id: None,
        }
    }

    #[test]
    fn test_scene_shapes_are_concatenated() {
        let scene = ObjScene {
            shapes: vec![triangle_shape("a", true), triangle_shape("b", false)],
            materials: Vec::new(),
        };
        let data = MeshData::from_scene(scene, &LoadOptions::default()).unwrap();

        assert_eq!(data.layout(), VertexLayout::Standard);
        assert_eq!(data.vertex_count(), 6);
        assert_eq!(data.indices(), &[0, 1, 2, 3, 4, 5]);
        assert_eq!(data.submeshes().len(), 2);
        assert_eq!(data.submeshes()[1].first_index, 3);
        assert_eq!(data.submeshes()[1].name, "b");

        let vertices = data.standard_vertices().unwrap();
        assert_eq!(vertices[1].position, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(vertices[1].normal, [0.0, 0.0, 1.0, 0.0]);
        // First shape gets tangents, the second has no normals and keeps zeros
        assert!((vertices[0].tangent[0] - 1.0).abs() < 1e-6);
        assert_eq!(vertices[3].tangent, [0.0; 4]);
    }

    #[test]
    fn test_flip_v() {
        let scene = ObjScene {
            shapes: vec![ObjShape {
                texcoords: vec![0.0, 0.25, 1.0, 0.0, 0.0, 1.0],
                ..triangle_shape("flip", true)
            }],
            materials: Vec::new(),
        };
        let options = LoadOptions {
            flip_v: true,
            ..Default::default()
        };
        let data = MeshData::from_scene(scene, &options).unwrap();
        let vertices = data.standard_vertices().unwrap();
        assert_eq!(vertices[0].tex_coord, [0.0, 0.75]);
        assert_eq!(vertices[1].tex_coord, [1.0, 1.0]);
        assert_eq!(vertices[2].tex_coord, [0.0, 0.0]);
    }

    #[test]
    fn test_scene_without_geometry_is_empty() {
        let scene = ObjScene::default();
        assert!(matches!(
            MeshData::from_scene(scene, &LoadOptions::default()),
            Err(Error::EmptyMesh)
        ));
    }

    #[test]
    fn test_cube_tangents_follow_u_axis() {
        let cube = MeshData::cube(2.0);
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.index_count(), 36);

        for face in cube.standard_vertices().unwrap().chunks(4) {
            let normal = Vector3::new(face[0].normal[0], face[0].normal[1], face[0].normal[2]);
            let u_axis = Vector3::new(
                face[1].position[0] - face[0].position[0],
                face[1].position[1] - face[0].position[1],
                face[1].position[2] - face[0].position[2],
            )
            .normalize();
            for vertex in face {
                let tangent = vertex.tangent4().xyz();
                assert!((tangent - u_axis).norm() < 1e-5);
                assert!(tangent.dot(&normal).abs() < 1e-5);
                assert!(vertex.position.iter().take(3).all(|c| c.abs() <= 1.0 + 1e-6));
            }
        }
    }
}
