/// Camera and model spin for the terminal view
use nalgebra::{Matrix4, Point3, Vector3};

/// Character cells are roughly twice as tall as they are wide
const CELL_ASPECT: f32 = 0.5;

/// Perspective camera orbiting the origin on the +Z axis
#[derive(Debug, Clone)]
pub struct Camera {
    pub eye: Point3<f32>,
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    aspect: f32,
}

impl Camera {
    pub fn new(columns: u16, rows: u16, distance: f32) -> Self {
        let mut camera = Self {
            eye: Point3::new(0.0, 0.0, distance),
            fov: std::f32::consts::FRAC_PI_4,
            near: 0.1,
            far: 100.0,
            aspect: 1.0,
        };
        camera.resize(columns, rows);
        camera
    }

    pub fn resize(&mut self, columns: u16, rows: u16) {
        self.aspect = columns.max(1) as f32 * CELL_ASPECT / rows.max(1) as f32;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.eye, &Point3::origin(), &Vector3::y())
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        Matrix4::new_perspective(self.aspect, self.fov, self.near, self.far)
    }

    /// Map a world-space point to `(column, row, depth)`
    ///
    /// Points behind the near plane or outside the view volume give `None`.
    pub fn project(&self, world: &Point3<f32>, columns: usize, rows: usize) -> Option<(f32, f32, f32)> {
        let view = self.view_matrix().transform_point(world);
        if -view.z < self.near {
            return None;
        }
        let ndc = self.projection_matrix().transform_point(&view);
        if !(-1.0..=1.0).contains(&ndc.x) || !(-1.0..=1.0).contains(&ndc.y) || !(-1.0..=1.0).contains(&ndc.z) {
            return None;
        }
        let column = (ndc.x + 1.0) * 0.5 * columns as f32;
        let row = (1.0 - ndc.y) * 0.5 * rows as f32;
        Some((column, row, ndc.z))
    }
}

/// Accumulated rotation around the three axes, in radians
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Spin {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Spin {
    pub fn rotate(&mut self, dx: f32, dy: f32, dz: f32) {
        self.x += dx;
        self.y += dy;
        self.z += dz;
    }

    /// X first, then Y, then Z
    pub fn model_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_axis_angle(&Vector3::z_axis(), self.z)
            * Matrix4::from_axis_angle(&Vector3::y_axis(), self.y)
            * Matrix4::from_axis_angle(&Vector3::x_axis(), self.x)
    }
}
