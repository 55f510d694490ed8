/// Per-vertex tangent frames for normal mapping
///
/// Triangle tangents and bitangents are accumulated per vertex from edge and
/// texture-coordinate deltas, then each vertex tangent is Gram-Schmidt
/// orthogonalized against its normal and the bitangent is rebuilt from the
/// normal with the accumulated handedness (Lengyel, Foundations of Game Engine
/// Development vol. 2).
use log::{debug, warn};
use nalgebra::{Vector2, Vector3};
use serde::Deserialize;

use crate::vertex::{FullVertex, StandardVertex};

/// Shortest orthogonalized tangent that is still normalized instead of replaced
const MIN_TANGENT_NORM: f32 = 1e-12;

/// How consecutive indices are grouped into triangles during accumulation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexWalk {
    /// Overlapping windows `i, i+1, i+2` for every `i`.
    #[default]
    Sliding,
    /// Disjoint triples `3i, 3i+1, 3i+2`.
    Triangles,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct TangentOptions {
    pub walk: IndexWalk,
    /// Windows whose UV determinant magnitude is at or below this contribute nothing
    pub degenerate_epsilon: f32,
}

impl Default for TangentOptions {
    fn default() -> Self {
        Self {
            walk: IndexWalk::Sliding,
            degenerate_epsilon: 1e-12,
        }
    }
}

/// A vertex record that carries the inputs and outputs of tangent generation
pub trait TangentFrame {
    fn position(&self) -> Vector3<f32>;
    fn normal(&self) -> Vector3<f32>;
    fn tex_coord(&self) -> Vector2<f32>;
    fn set_tangent_frame(&mut self, tangent: Vector3<f32>, bitangent: Vector3<f32>, handedness: f32);
}

impl TangentFrame for StandardVertex {
    fn position(&self) -> Vector3<f32> {
        Vector3::new(self.position[0], self.position[1], self.position[2])
    }

    fn normal(&self) -> Vector3<f32> {
        Vector3::new(self.normal[0], self.normal[1], self.normal[2])
    }

    fn tex_coord(&self) -> Vector2<f32> {
        Vector2::from(self.tex_coord)
    }

    /// Handedness is already folded into the bitangent, so tangent.w is left at zero
    fn set_tangent_frame(&mut self, tangent: Vector3<f32>, bitangent: Vector3<f32>, _handedness: f32) {
        self.tangent = [tangent.x, tangent.y, tangent.z, 0.0];
        self.bitangent = [bitangent.x, bitangent.y, bitangent.z, 0.0];
    }
}

impl TangentFrame for FullVertex {
    fn position(&self) -> Vector3<f32> {
        Vector3::from(self.position)
    }

    fn normal(&self) -> Vector3<f32> {
        Vector3::from(self.normal)
    }

    /// The first UV set drives the tangent frame
    fn tex_coord(&self) -> Vector2<f32> {
        Vector2::from(self.tex_coords[0])
    }

    fn set_tangent_frame(&mut self, tangent: Vector3<f32>, _bitangent: Vector3<f32>, handedness: f32) {
        self.tangent = [tangent.x, tangent.y, tangent.z, handedness];
    }
}

/// Compute tangent frames in place for every vertex referenced by `indices`
///
/// Vertices no window touches, and windows that only produce a tangent
/// parallel to the normal, get an arbitrary unit tangent perpendicular to the
/// normal so the output never contains NaN or infinity.
pub fn calculate_tangents<V: TangentFrame>(vertices: &mut [V], indices: &[u32], options: &TangentOptions) {
    let vertex_count = vertices.len();
    let mut tangents = vec![Vector3::<f32>::zeros(); vertex_count];
    let mut bitangents = vec![Vector3::<f32>::zeros(); vertex_count];

    let mut degenerate = 0usize;
    let mut out_of_range = 0usize;
    let mut accumulate = |window: &[u32]| {
        let (i0, i1, i2) = (window[0] as usize, window[1] as usize, window[2] as usize);
        if i0.max(i1).max(i2) >= vertex_count {
            out_of_range += 1;
            return;
        }

        let p0 = vertices[i0].position();
        let w0 = vertices[i0].tex_coord();
        let w1 = vertices[i1].tex_coord();
        let w2 = vertices[i2].tex_coord();

        let e1 = vertices[i1].position() - p0;
        let e2 = vertices[i2].position() - p0;
        let (x1, x2) = (w1.x - w0.x, w2.x - w0.x);
        let (y1, y2) = (w1.y - w0.y, w2.y - w0.y);

        let det = x1 * y2 - x2 * y1;
        if !det.is_finite() || det.abs() <= options.degenerate_epsilon {
            degenerate += 1;
            return;
        }

        let r = 1.0 / det;
        let t = (e1 * y2 - e2 * y1) * r;
        let b = (e2 * x1 - e1 * x2) * r;

        for i in [i0, i1, i2] {
            tangents[i] += t;
            bitangents[i] += b;
        }
    };

    match options.walk {
        IndexWalk::Sliding => indices.windows(3).for_each(&mut accumulate),
        IndexWalk::Triangles => indices.chunks_exact(3).for_each(&mut accumulate),
    }

    if out_of_range > 0 {
        warn!("skipped {} tangent windows referencing vertices past {}", out_of_range, vertex_count);
    }
    if degenerate > 0 {
        debug!("skipped {} tangent windows with degenerate texture coordinates", degenerate);
    }

    let mut replaced = 0usize;
    for ((vertex, t), b) in vertices.iter_mut().zip(&tangents).zip(&bitangents) {
        let n = vertex.normal();

        // Gram-Schmidt
        let tangent = match (t - n * n.dot(t)).try_normalize(MIN_TANGENT_NORM) {
            Some(tangent) => tangent,
            None => {
                replaced += 1;
                any_perpendicular(&n)
            }
        };

        let handedness = if t.cross(b).dot(&n) > 0.0 { 1.0 } else { -1.0 };
        let bitangent = n.cross(&tangent) * handedness;

        vertex.set_tangent_frame(tangent, bitangent, handedness);
    }

    if replaced > 0 {
        debug!("{} of {} vertices had no usable tangent, used a perpendicular", replaced, vertex_count);
    }
}

/// Some unit vector perpendicular to `normal` (the x axis for a zero normal)
fn any_perpendicular(normal: &Vector3<f32>) -> Vector3<f32> {
    let axis = if normal.x.abs() < 0.9 * normal.norm() {
        Vector3::x()
    } else {
        Vector3::y()
    };
    normal
        .cross(&axis)
        .try_normalize(MIN_TANGENT_NORM)
        .unwrap_or_else(Vector3::x)
}
