//! Detection of ground planes embedded in imported assets
//!
//! An asset exported together with its own floor fights the viewer's ground
//! plane for depth. Meshes that are flat, wide and close to y = 0 are treated
//! as such a floor. Tilted or segmented floors slip through, and genuinely
//! large flat objects at ground level get caught; both are accepted.

use crate::bounds::Aabb3;
use crate::config::GroundFilterConfig;

/// How an imported mesh should be rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshTreatment {
    /// Hidden, neither casts nor receives shadows
    SuppressGround,
    /// Visible, casts and receives shadows, double-sided
    Render,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundFilter {
    pub max_thickness: f32,
    pub min_span: f32,
    pub max_center_height: f32,
}

impl Default for GroundFilter {
    fn default() -> Self {
        Self::from(&GroundFilterConfig::default())
    }
}

impl From<&GroundFilterConfig> for GroundFilter {
    fn from(config: &GroundFilterConfig) -> Self {
        Self {
            max_thickness: config.max_thickness,
            min_span: config.min_span,
            max_center_height: config.max_center_height,
        }
    }
}

impl GroundFilter {
    /// Whether a mesh with these world bounds looks like a floor
    pub fn is_likely_ground(&self, bounds: &Aabb3) -> bool {
        let size = bounds.size();
        let center = bounds.center();

        let is_flat = size.y < self.max_thickness;
        let is_large = size.x > self.min_span && size.z > self.min_span;
        let near_zero = center.y.abs() < self.max_center_height;

        is_flat && is_large && near_zero
    }

    pub fn classify(&self, bounds: &Aabb3) -> MeshTreatment {
        if self.is_likely_ground(bounds) {
            MeshTreatment::SuppressGround
        } else {
            MeshTreatment::Render
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn slab(center_y: f32, size: Vec3) -> Aabb3 {
        Aabb3::from_center_size(Vec3::new(0.0, center_y, 0.0), size)
    }

    #[test]
    fn test_floor_is_suppressed() {
        let filter = GroundFilter::default();
        let floor = slab(0.0, Vec3::new(40.0, 0.01, 40.0));
        assert!(filter.is_likely_ground(&floor));
        assert_eq!(filter.classify(&floor), MeshTreatment::SuppressGround);
    }

    #[test]
    fn test_each_condition_is_required() {
        let filter = GroundFilter::default();
        // Too thick
        assert!(!filter.is_likely_ground(&slab(0.0, Vec3::new(40.0, 0.2, 40.0))));
        // Too narrow in one direction
        assert!(!filter.is_likely_ground(&slab(0.0, Vec3::new(40.0, 0.01, 10.0))));
        // Floating above the ground
        assert!(!filter.is_likely_ground(&slab(3.0, Vec3::new(40.0, 0.01, 40.0))));
        // A table
        assert_eq!(
            filter.classify(&slab(0.5, Vec3::new(2.0, 1.0, 1.0))),
            MeshTreatment::Render
        );
    }

    #[test]
    fn test_thresholds_are_strict() {
        let filter = GroundFilter::default();
        assert!(!filter.is_likely_ground(&slab(0.0, Vec3::new(25.0, 0.01, 30.0))));
        assert!(!filter.is_likely_ground(&slab(1.0, Vec3::new(30.0, 0.01, 30.0))));
        assert!(filter.is_likely_ground(&slab(-0.99, Vec3::new(25.1, 0.149, 25.1))));
    }

    #[test]
    fn test_from_config() {
        let config = GroundFilterConfig {
            max_thickness: 1.0,
            min_span: 5.0,
            max_center_height: 2.0,
        };
        let filter = GroundFilter::from(&config);
        assert!(filter.is_likely_ground(&slab(1.5, Vec3::new(6.0, 0.5, 6.0))));
    }
}
