/// Vertex record shapes and the attribute contract each one is uploaded with
use bytemuck::{Pod, Zeroable};
use nalgebra::{Vector2, Vector3, Vector4};

use crate::error::{Error, Result};

/// The three mutually exclusive vertex formats a mesh can be built in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexLayout {
    /// position (3) + color (3)
    Base,
    /// position (4) + normal (4) + tangent (4) + bitangent (4) + uv (2)
    Standard,
    /// position (3) + color (3) + normal (3) + tangent (4) + 3 x uv (2)
    Full,
}

impl VertexLayout {
    /// Number of floats in one record
    pub const fn stride_floats(self) -> usize {
        match self {
            VertexLayout::Base => 6,
            VertexLayout::Standard => 18,
            VertexLayout::Full => 19,
        }
    }

    /// Size of one record in bytes, which is also the attribute stride
    pub const fn record_size(self) -> usize {
        self.stride_floats() * std::mem::size_of::<f32>()
    }

    pub fn attributes(self) -> &'static [VertexAttribute] {
        match self {
            VertexLayout::Base => BaseVertex::ATTRIBUTES,
            VertexLayout::Standard => StandardVertex::ATTRIBUTES,
            VertexLayout::Full => FullVertex::ATTRIBUTES,
        }
    }
}

impl TryFrom<u32> for VertexLayout {
    type Error = Error;

    fn try_from(selector: u32) -> Result<Self> {
        match selector {
            0 => Ok(VertexLayout::Base),
            1 => Ok(VertexLayout::Standard),
            2 => Ok(VertexLayout::Full),
            other => Err(Error::InvalidLayoutSelector(other)),
        }
    }
}

impl std::fmt::Display for VertexLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VertexLayout::Base => write!(f, "base"),
            VertexLayout::Standard => write!(f, "standard"),
            VertexLayout::Full => write!(f, "full"),
        }
    }
}

/// Scalar type of an attribute component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    F32,
}

impl ComponentType {
    pub const fn size(self) -> usize {
        match self {
            ComponentType::F32 => 4,
        }
    }
}

/// One field of a vertex record as the graphics pipeline sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    pub location: u32,
    pub components: u32,
    pub component_type: ComponentType,
    pub normalized: bool,
    /// Byte offset of the field inside the record
    pub offset: usize,
}

impl VertexAttribute {
    const fn float(location: u32, components: u32, offset: usize) -> Self {
        Self {
            location,
            components,
            component_type: ComponentType::F32,
            normalized: false,
            offset,
        }
    }

    /// Size of the field in bytes
    pub const fn size(&self) -> usize {
        self.components as usize * self.component_type.size()
    }
}

/// A fixed-shape vertex record that can be read from a flat float array and uploaded verbatim
pub trait VertexRecord: Pod {
    const LAYOUT: VertexLayout;
    const ATTRIBUTES: &'static [VertexAttribute];

    /// Build a record from exactly `LAYOUT.stride_floats()` floats
    fn from_floats(chunk: &[f32]) -> Self {
        bytemuck::pod_read_unaligned(bytemuck::cast_slice(chunk))
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct BaseVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl VertexRecord for BaseVertex {
    const LAYOUT: VertexLayout = VertexLayout::Base;
    const ATTRIBUTES: &'static [VertexAttribute] = &[
        VertexAttribute::float(0, 3, 0),
        VertexAttribute::float(1, 3, 12),
    ];
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct StandardVertex {
    pub position: [f32; 4],
    pub normal: [f32; 4],
    pub tangent: [f32; 4],
    pub bitangent: [f32; 4],
    pub tex_coord: [f32; 2],
}

impl StandardVertex {
    /// Homogeneous record: position gets w = 1, normal gets w = 0, tangent frame is zeroed
    pub fn new(position: Vector3<f32>, normal: Vector3<f32>, tex_coord: Vector2<f32>) -> Self {
        Self {
            position: [position.x, position.y, position.z, 1.0],
            normal: [normal.x, normal.y, normal.z, 0.0],
            tangent: [0.0; 4],
            bitangent: [0.0; 4],
            tex_coord: [tex_coord.x, tex_coord.y],
        }
    }

    pub fn tangent4(&self) -> Vector4<f32> {
        Vector4::from(self.tangent)
    }
}

impl VertexRecord for StandardVertex {
    const LAYOUT: VertexLayout = VertexLayout::Standard;
    const ATTRIBUTES: &'static [VertexAttribute] = &[
        VertexAttribute::float(0, 4, 0),
        VertexAttribute::float(1, 4, 16),
        VertexAttribute::float(2, 4, 32),
        VertexAttribute::float(3, 4, 48),
        VertexAttribute::float(4, 2, 64),
    ];
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct FullVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub normal: [f32; 3],
    /// xyz tangent, w handedness
    pub tangent: [f32; 4],
    pub tex_coords: [[f32; 2]; 3],
}

impl VertexRecord for FullVertex {
    const LAYOUT: VertexLayout = VertexLayout::Full;
    const ATTRIBUTES: &'static [VertexAttribute] = &[
        VertexAttribute::float(0, 3, 0),
        VertexAttribute::float(1, 3, 12),
        VertexAttribute::float(2, 3, 24),
        VertexAttribute::float(3, 4, 36),
        VertexAttribute::float(4, 2, 52),
        VertexAttribute::float(5, 2, 60),
        VertexAttribute::float(6, 2, 68),
    ];
}

const _: () = assert!(std::mem::size_of::<BaseVertex>() == VertexLayout::Base.record_size());
const _: () = assert!(std::mem::size_of::<StandardVertex>() == VertexLayout::Standard.record_size());
const _: () = assert!(std::mem::size_of::<FullVertex>() == VertexLayout::Full.record_size());

/// The vertex sequence of a mesh; only one record shape can be populated at a time
#[derive(Debug, Clone, PartialEq)]
pub enum Vertices {
    Base(Vec<BaseVertex>),
    Standard(Vec<StandardVertex>),
    Full(Vec<FullVertex>),
}

impl Vertices {
    pub fn layout(&self) -> VertexLayout {
        match self {
            Vertices::Base(_) => VertexLayout::Base,
            Vertices::Standard(_) => VertexLayout::Standard,
            Vertices::Full(_) => VertexLayout::Full,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Vertices::Base(v) => v.len(),
            Vertices::Standard(v) => v.len(),
            Vertices::Full(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records exactly as they are laid out for the vertex buffer
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Vertices::Base(v) => bytemuck::cast_slice(v),
            Vertices::Standard(v) => bytemuck::cast_slice(v),
            Vertices::Full(v) => bytemuck::cast_slice(v),
        }
    }

    /// Object-space position of a vertex, whatever the record shape
    pub fn position(&self, index: usize) -> Option<Vector3<f32>> {
        match self {
            Vertices::Base(v) => v.get(index).map(|v| Vector3::from(v.position)),
            Vertices::Standard(v) => v.get(index).map(|v| Vector4::from(v.position).xyz()),
            Vertices::Full(v) => v.get(index).map(|v| Vector3::from(v.position)),
        }
    }
}
