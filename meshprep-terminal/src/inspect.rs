/// Text report describing a built mesh
use std::fmt;

use meshprep_core::{MeshData, Vertices};
use nalgebra::Vector3;

/// How far the generated tangent frames are from orthonormal
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TangentStats {
    /// Vertices with a non-zero tangent
    pub framed: usize,
    /// Largest `|tangent . normal|` over framed vertices with a non-zero normal
    pub max_normal_dot: f32,
    /// Largest `| |tangent| - 1 |`
    pub max_length_error: f32,
}

impl TangentStats {
    fn from_frames(frames: impl Iterator<Item = (Vector3<f32>, Vector3<f32>)>) -> Self {
        let mut stats = Self::default();
        for (tangent, normal) in frames {
            if tangent.norm_squared() == 0.0 {
                continue;
            }
            stats.framed += 1;
            stats.max_length_error = stats.max_length_error.max((tangent.norm() - 1.0).abs());
            if let Some(normal) = normal.try_normalize(1e-12) {
                stats.max_normal_dot = stats.max_normal_dot.max(tangent.dot(&normal).abs());
            }
        }
        stats
    }
}

pub struct Report<'a> {
    source: String,
    data: &'a MeshData,
    tangents: Option<TangentStats>,
}

impl<'a> Report<'a> {
    pub fn new(source: impl Into<String>, data: &'a MeshData) -> Self {
        let xyz = |v: &[f32]| Vector3::new(v[0], v[1], v[2]);
        let tangents = match data.vertices() {
            Vertices::Base(_) => None,
            Vertices::Standard(vertices) => Some(TangentStats::from_frames(
                vertices.iter().map(|v| (xyz(&v.tangent), xyz(&v.normal))),
            )),
            Vertices::Full(vertices) => Some(TangentStats::from_frames(
                vertices.iter().map(|v| (xyz(&v.tangent), xyz(&v.normal))),
            )),
        };
        Self {
            source: source.into(),
            data,
            tangents,
        }
    }

    pub fn tangents(&self) -> Option<TangentStats> {
        self.tangents
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.data;
        writeln!(f, "mesh:      {}", self.source)?;
        writeln!(
            f,
            "layout:    {} ({} bytes per vertex)",
            data.layout(),
            data.layout().record_size()
        )?;
        writeln!(f, "vertices:  {}", data.vertex_count())?;
        writeln!(f, "indices:   {} ({} triangles)", data.index_count(), data.index_count() / 3)?;

        writeln!(f, "sub-meshes:")?;
        for submesh in data.submeshes() {
            let material = submesh
                .material_id
                .and_then(|id| data.materials().get(id))
                .map_or("-", |m| m.name.as_str());
            let name = if submesh.name.is_empty() { "(unnamed)" } else { submesh.name.as_str() };
            writeln!(
                f,
                "  {:<20} first {:>8}  count {:>8}  material {}",
                name, submesh.first_index, submesh.index_count, material
            )?;
        }

        if !data.materials().is_empty() {
            writeln!(f, "materials:")?;
            for material in data.materials() {
                let textures = [
                    ("diffuse", &material.diffuse_texture),
                    ("specular", &material.specular_texture),
                    ("normal", &material.normal_texture),
                    ("alpha", &material.alpha_texture),
                ]
                .into_iter()
                .filter_map(|(kind, path)| path.as_ref().map(|p| format!("{}={}", kind, p)))
                .collect::<Vec<_>>();
                writeln!(
                    f,
                    "  {:<20} Kd {:?}  {}",
                    material.name,
                    material.diffuse,
                    textures.join(" ")
                )?;
            }
        }

        if let Some(stats) = self.tangents {
            writeln!(
                f,
                "tangents:  {} framed, max |t.n| {:.2e}, max ||t|-1| {:.2e}",
                stats.framed, stats.max_normal_dot, stats.max_length_error
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_report() {
        let cube = MeshData::cube(1.0);
        let report = Report::new("cube", &cube);

        let stats = report.tangents().unwrap();
        assert_eq!(stats.framed, 24);
        assert!(stats.max_normal_dot < 1e-5);
        assert!(stats.max_length_error < 1e-5);

        let text = report.to_string();
        assert!(text.contains("layout:    standard (72 bytes per vertex)"));
        assert!(text.contains("indices:   36 (12 triangles)"));
        assert!(text.contains("cube"));
    }

    #[test]
    fn test_zero_tangents_are_not_counted() {
        let stats = TangentStats::from_frames(
            [
                (Vector3::zeros(), Vector3::z()),
                (Vector3::new(2.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 3.0)),
            ]
            .into_iter(),
        );
        assert_eq!(stats.framed, 1);
        assert!((stats.max_length_error - 1.0).abs() < 1e-6);
        assert!(stats.max_normal_dot.abs() < 1e-6);
    }
}
