//! Orbit camera with hand-rolled column-major matrices

use ember_core::Vec3;
use ember_particles::Mat4;

/// A 3D camera orbiting a target point
pub struct Camera {
    /// Camera position, derived from the orbit parameters
    pub position: Vec3,
    /// Target point the camera looks at
    pub target: Vec3,
    /// Up vector
    pub up: Vec3,
    /// Field of view in degrees
    pub fov: f32,
    /// Near clipping plane
    pub near: f32,
    /// Far clipping plane
    pub far: f32,
    /// Aspect ratio (width / height)
    pub aspect: f32,

    /// Distance from target
    pub distance: f32,
    /// Horizontal angle in radians
    pub yaw: f32,
    /// Vertical angle in radians
    pub pitch: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 3.0),
            target: Vec3::ZERO,
            up: Vec3::UP,
            fov: 45.0,
            near: 0.1,
            far: 100.0,
            aspect: 16.0 / 9.0,
            distance: 3.0,
            yaw: 0.0,
            pitch: 0.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update position based on orbit parameters
    pub fn update_orbit(&mut self) {
        let x = self.distance * self.pitch.cos() * self.yaw.sin();
        let y = self.distance * self.pitch.sin();
        let z = self.distance * self.pitch.cos() * self.yaw.cos();

        self.position = Vec3::new(self.target.x + x, self.target.y + y, self.target.z + z);
    }

    /// Orbit horizontally (rotate around target)
    pub fn orbit_horizontal(&mut self, delta: f32) {
        self.yaw += delta;
        self.update_orbit();
    }

    /// Orbit vertically (tilt up/down)
    pub fn orbit_vertical(&mut self, delta: f32) {
        self.pitch += delta;
        // Clamp short of ±90° to avoid gimbal lock
        self.pitch = self.pitch.clamp(-1.55, 1.55);
        self.update_orbit();
    }

    /// Zoom in/out
    pub fn zoom(&mut self, delta: f32) {
        self.distance = (self.distance - delta).clamp(0.5, 50.0);
        self.update_orbit();
    }

    /// Get the view matrix (4x4, column-major)
    pub fn view_matrix(&self) -> Mat4 {
        let f = (self.target - self.position).normalized();
        let s = f.cross(&self.up).normalized();
        let u = s.cross(&f);

        [
            [s.x, u.x, -f.x, 0.0],
            [s.y, u.y, -f.y, 0.0],
            [s.z, u.z, -f.z, 0.0],
            [
                -s.dot(&self.position),
                -u.dot(&self.position),
                f.dot(&self.position),
                1.0,
            ],
        ]
    }

    /// Get the perspective projection matrix (4x4, column-major)
    pub fn projection_matrix(&self) -> Mat4 {
        let fov_rad = self.fov.to_radians();
        let f = 1.0 / (fov_rad / 2.0).tan();

        let depth = self.far - self.near;

        [
            [f / self.aspect, 0.0, 0.0, 0.0],
            [0.0, f, 0.0, 0.0],
            [0.0, 0.0, -(self.far + self.near) / depth, -1.0],
            [0.0, 0.0, -(2.0 * self.far * self.near) / depth, 0.0],
        ]
    }

    /// Camera basis vectors (right, up, forward), world space
    fn basis(&self) -> (Vec3, Vec3, Vec3) {
        let f = (self.target - self.position).normalized();
        let s = f.cross(&self.up).normalized();
        let u = s.cross(&f);
        (s, u, f)
    }

    /// World-space ray through a cursor position in normalized device
    /// coordinates (x right, y up, both in [-1, 1]). Returns (origin,
    /// direction); direction is not normalized.
    pub fn cursor_ray(&self, ndc_x: f32, ndc_y: f32) -> (Vec3, Vec3) {
        let (right, up, forward) = self.basis();
        let half_h = (self.fov.to_radians() / 2.0).tan();
        let half_w = half_h * self.aspect;
        let dir = forward + right * (ndc_x * half_w) + up * (ndc_y * half_h);
        (self.position, dir)
    }

    /// Intersect the cursor ray with the world plane z = 0, where particles
    /// are emitted. None when the ray runs parallel or points away.
    pub fn cursor_on_emission_plane(&self, ndc_x: f32, ndc_y: f32) -> Option<Vec3> {
        let (origin, dir) = self.cursor_ray(ndc_x, ndc_y);
        if dir.z.abs() < 1e-6 {
            return None;
        }
        let t = -origin.z / dir.z;
        if t <= 0.0 {
            return None;
        }
        Some(origin + dir * t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_orbit_looks_down_negative_z() {
        let mut camera = Camera::new();
        camera.update_orbit();
        assert!((camera.position.z - 3.0).abs() < 1e-5);
        assert!(camera.position.x.abs() < 1e-5);
        assert!(camera.position.y.abs() < 1e-5);
    }

    #[test]
    fn view_matrix_moves_target_onto_view_axis() {
        let mut camera = Camera::new();
        camera.update_orbit();
        let m = camera.view_matrix();
        // target (origin) maps to (0, 0, -distance)
        let v = [m[3][0], m[3][1], m[3][2]];
        assert!(v[0].abs() < 1e-5);
        assert!(v[1].abs() < 1e-5);
        assert!((v[2] + 3.0).abs() < 1e-5);
    }

    #[test]
    fn center_cursor_hits_plane_at_origin() {
        let mut camera = Camera::new();
        camera.update_orbit();
        let hit = camera.cursor_on_emission_plane(0.0, 0.0).unwrap();
        assert!(hit.length() < 1e-5);
    }

    #[test]
    fn cursor_ray_parallel_to_plane_misses() {
        let mut camera = Camera::new();
        camera.position = Vec3::new(0.0, 0.0, 3.0);
        camera.target = Vec3::new(1.0, 0.0, 3.0);
        assert!(camera.cursor_on_emission_plane(0.0, 0.0).is_none());
    }

    #[test]
    fn zoom_clamps_distance() {
        let mut camera = Camera::new();
        camera.zoom(100.0);
        assert!((camera.distance - 0.5).abs() < 1e-6);
        camera.zoom(-100.0);
        assert!((camera.distance - 50.0).abs() < 1e-6);
    }
}
