//! Camera framing and the saved camera pose

use glam::Vec3;

/// Smallest extent used for framing, keeps near < far for degenerate boxes
pub const MIN_FRAMING_EXTENT: f32 = 0.01;

/// Smallest near plane distance
pub const MIN_NEAR: f32 = 0.01;

/// Elevated diagonal the camera looks along (before normalization)
pub const VIEW_DIRECTION: Vec3 = Vec3::new(1.0, 0.8, 1.0);

/// A restorable camera pose
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    pub position: Vec3,
    pub target: Vec3,
    pub near: f32,
    pub far: f32,
}

impl CameraState {
    pub fn distance(&self) -> f32 {
        self.position.distance(self.target)
    }

    /// Orbit angles (azimuth, elevation) of the position around the target.
    ///
    /// Azimuth is measured from +X towards +Z, elevation from the ground
    /// plane towards +Y.
    pub fn orbit_angles(&self) -> (f32, f32) {
        let offset = self.position - self.target;
        let horizontal = Vec3::new(offset.x, 0.0, offset.z).length();
        (offset.z.atan2(offset.x), offset.y.atan2(horizontal))
    }
}

/// Position on an orbit sphere around `target`, inverse of `CameraState::orbit_angles`
pub fn orbit_position(target: Vec3, distance: f32, azimuth: f32, elevation: f32) -> Vec3 {
    target
        + Vec3::new(
            distance * elevation.cos() * azimuth.cos(),
            distance * elevation.sin(),
            distance * elevation.cos() * azimuth.sin(),
        )
}

/// Framing parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FramingOptions {
    /// Vertical field of view, radians
    pub vertical_fov: f32,
    pub padding: f32,
}

/// Camera distance at which `max_extent` fills the vertical field of view,
/// scaled by `padding`
pub fn framing_distance(max_extent: f32, options: &FramingOptions) -> f32 {
    let extent = max_extent.max(MIN_FRAMING_EXTENT);
    (extent / (2.0 * (options.vertical_fov / 2.0).tan())) * options.padding
}

/// Camera pose that frames a box with the given center and size
pub fn frame_box(center: Vec3, size: Vec3, options: &FramingOptions) -> CameraState {
    let distance = framing_distance(size.max_element(), options);
    let position = center + VIEW_DIRECTION.normalize() * distance;

    CameraState {
        position,
        target: center,
        near: (distance / 100.0).max(MIN_NEAR),
        far: distance * 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    fn options(padding: f32) -> FramingOptions {
        FramingOptions {
            vertical_fov: 50.0_f32.to_radians(),
            padding,
        }
    }

    #[test]
    fn test_distance_fills_fov() {
        let opts = options(1.0);
        let d = framing_distance(4.0, &opts);
        // At distance d the half-height visible is d * tan(fov/2) = 2
        assert!((d * (opts.vertical_fov / 2.0).tan() - 2.0).abs() < EPS);

        let padded = framing_distance(4.0, &options(1.35));
        assert!((padded - d * 1.35).abs() < EPS);
    }

    #[test]
    fn test_frame_box_pose() {
        let center = Vec3::new(2.0, 1.0, 0.0);
        let cam = frame_box(center, Vec3::new(4.0, 2.0, 1.0), &options(1.25));
        let d = framing_distance(4.0, &options(1.25));

        assert_eq!(cam.target, center);
        assert!((cam.distance() - d).abs() < EPS);
        let dir = (cam.position - center).normalize();
        assert!((dir - VIEW_DIRECTION.normalize()).length() < EPS);
        assert!((cam.near - (d / 100.0).max(MIN_NEAR)).abs() < EPS);
        assert!((cam.far - d * 100.0).abs() < EPS);
    }

    #[test]
    fn test_small_scene_near_clamped() {
        let cam = frame_box(Vec3::ZERO, Vec3::splat(0.05), &options(1.25));
        assert_eq!(cam.near, MIN_NEAR);
        assert!(cam.far > cam.near);
    }

    #[test]
    fn test_degenerate_box_still_has_depth_range() {
        let cam = frame_box(Vec3::ZERO, Vec3::ZERO, &options(1.25));
        assert!(cam.distance() > 0.0);
        assert!(cam.far > cam.near);
    }

    #[test]
    fn test_orbit_angles_roundtrip() {
        let cam = frame_box(Vec3::new(1.0, 2.0, 3.0), Vec3::splat(3.0), &options(1.25));
        let (az, el) = cam.orbit_angles();
        assert!((az - std::f32::consts::FRAC_PI_4).abs() < EPS);
        let p = orbit_position(cam.target, cam.distance(), az, el);
        assert!((p - cam.position).length() < EPS);
    }
}
