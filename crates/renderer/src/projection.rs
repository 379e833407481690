use glam::{Mat4, Vec3};

pub const NEAR: f32 = 1.0;
pub const FAR: f32 = 10.0;

pub const EYE: Vec3 = Vec3::new(0.0, 0.0, 1.5);
pub const LOOK_AT: Vec3 = Vec3::new(0.0, 0.0, -0.5);
pub const UP: Vec3 = Vec3::new(0.0, 1.0, 0.0);

/// Bounds of the symmetric view volume in front of the camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
    pub near: f32,
    pub far: f32,
}

impl Frustum {
    /// Frustum for a surface of the given pixel size. Zero dimensions are
    /// clamped to one pixel.
    pub fn for_surface(width: u32, height: u32) -> Self {
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        Self {
            left: -aspect,
            right: aspect,
            bottom: -1.0,
            top: 1.0,
            near: NEAR,
            far: FAR,
        }
    }

    /// Right-handed perspective matrix with a `[0, 1]` depth range.
    pub fn matrix(&self) -> Mat4 {
        Mat4::frustum_rh(
            self.left,
            self.right,
            self.bottom,
            self.top,
            self.near,
            self.far,
        )
    }
}

/// Fixed camera, surface-sized projection and per-frame composition.
#[derive(Debug, Clone, Copy)]
pub struct ProjectionPipeline {
    view: Mat4,
    frustum: Frustum,
    projection: Mat4,
}

impl ProjectionPipeline {
    pub fn new(width: u32, height: u32) -> Self {
        let frustum = Frustum::for_surface(width, height);
        Self {
            view: Mat4::look_at_rh(EYE, LOOK_AT, UP),
            frustum,
            projection: frustum.matrix(),
        }
    }

    pub fn on_surface_size(&mut self, width: u32, height: u32) {
        self.frustum = Frustum::for_surface(width, height);
        self.projection = self.frustum.matrix();
        tracing::debug!(width, height, right = self.frustum.right, "projection updated");
    }

    pub fn frustum(&self) -> Frustum {
        self.frustum
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    /// `projection * view * model`.
    pub fn compose(&self, model: Mat4) -> Mat4 {
        self.projection * self.view * model
    }
}

/// Rotation about Z by `angle_degrees`.
pub fn model_matrix(angle_degrees: f32) -> Mat4 {
    Mat4::from_rotation_z(angle_degrees.to_radians())
}
