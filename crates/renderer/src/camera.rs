use cgmath::{
    perspective, Deg, EuclideanSpace, InnerSpace, Matrix4, Point3, Rad, SquareMatrix, Vector3,
};

/// Camera consumed by the render loop.
pub trait Camera {
    /// Applies input gathered since the previous frame.
    fn update(&mut self);
    fn eye(&self) -> Point3<f32>;
    fn inv_view_proj(&self) -> Matrix4<f32>;
    fn set_aspect_ratio(&mut self, ratio: f32);
    fn update_projection_matrix(&mut self);
}

const FOVY_DEGREES: f32 = 45.0;
const NEAR: f32 = 0.1;
const FAR: f32 = 1000.0;
const RADIANS_PER_PIXEL: f32 = 0.005;
const MIN_DISTANCE: f32 = 0.5;
const MAX_PITCH: f32 = 1.5;

/// Orbits a target point; mouse drags rotate, scroll zooms.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    target: Point3<f32>,
    up: Vector3<f32>,
    distance: f32,
    yaw: f32,
    pitch: f32,
    aspect_ratio: f32,
    projection: Matrix4<f32>,
    inv_view_proj: Matrix4<f32>,
    pending_drag: (f32, f32),
    pending_zoom: f32,
}

impl OrbitCamera {
    pub fn new(position: Point3<f32>, target: Point3<f32>) -> Self {
        let offset = position - target;
        let distance = offset.magnitude().max(MIN_DISTANCE);
        let yaw = offset.x.atan2(offset.z);
        let pitch = (offset.y / distance).clamp(-1.0, 1.0).asin();
        let mut camera = Self {
            target,
            up: Vector3::unit_y(),
            distance,
            yaw,
            pitch,
            aspect_ratio: 1.0,
            projection: Matrix4::identity(),
            inv_view_proj: Matrix4::identity(),
            pending_drag: (0.0, 0.0),
            pending_zoom: 0.0,
        };
        camera.update_projection_matrix();
        camera
    }

    /// Queues a drag of `(dx, dy)` pixels for the next [`Camera::update`].
    pub fn push_drag(&mut self, dx: f32, dy: f32) {
        self.pending_drag.0 += dx;
        self.pending_drag.1 += dy;
    }

    /// Queues a zoom step; positive values move towards the target.
    pub fn push_zoom(&mut self, steps: f32) {
        self.pending_zoom += steps;
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    fn view(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.eye(), self.target, self.up)
    }

    fn refresh_inverse(&mut self) {
        self.inv_view_proj = (self.projection * self.view())
            .invert()
            .unwrap_or_else(Matrix4::identity);
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new(Point3::new(0.0, 0.0, 5.0), Point3::origin())
    }
}

impl Camera for OrbitCamera {
    fn update(&mut self) {
        let (dx, dy) = std::mem::take(&mut self.pending_drag);
        let zoom = std::mem::take(&mut self.pending_zoom);
        if dx != 0.0 || dy != 0.0 || zoom != 0.0 {
            self.yaw -= dx * RADIANS_PER_PIXEL;
            self.pitch = (self.pitch + dy * RADIANS_PER_PIXEL).clamp(-MAX_PITCH, MAX_PITCH);
            self.distance = (self.distance * 0.9_f32.powf(zoom)).max(MIN_DISTANCE);
        }
        self.refresh_inverse();
    }

    fn eye(&self) -> Point3<f32> {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        let offset = Vector3::new(sin_yaw * cos_pitch, sin_pitch, cos_yaw * cos_pitch);
        self.target + offset * self.distance
    }

    fn inv_view_proj(&self) -> Matrix4<f32> {
        self.inv_view_proj
    }

    fn set_aspect_ratio(&mut self, ratio: f32) {
        if ratio.is_finite() && ratio > 0.0 {
            self.aspect_ratio = ratio;
        }
    }

    fn update_projection_matrix(&mut self) {
        self.projection = perspective(
            Rad::from(Deg(FOVY_DEGREES)),
            self.aspect_ratio,
            NEAR,
            FAR,
        );
        self.refresh_inverse();
    }
}
