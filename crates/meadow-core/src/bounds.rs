//! Axis-aligned bounding boxes

use glam::{Affine3A, Vec3};

/// Axis-aligned box in world (or root-relative) coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb3 {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb3 {
    /// Box spanning two arbitrary corner points
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Degenerate box containing a single point
    pub fn from_point(p: Vec3) -> Self {
        Self { min: p, max: p }
    }

    /// Box centered on `center` with the given full size
    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size.abs() * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Smallest box containing every point, or `None` for an empty iterator
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Vec3>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        Some(iter.fold(Self::from_point(first), |b, p| b.expanded_to(p)))
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Largest of the three extents
    pub fn max_extent(&self) -> f32 {
        self.size().max_element()
    }

    pub fn expanded_to(&self, p: Vec3) -> Self {
        Self {
            min: self.min.min(p),
            max: self.max.max(p),
        }
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn translated(&self, offset: Vec3) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    pub fn corners(&self) -> [Vec3; 8] {
        [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ]
    }

    /// Axis-aligned box enclosing this box after an affine transform
    pub fn transformed(&self, transform: &Affine3A) -> Self {
        let corners = self.corners().map(|c| transform.transform_point3(c));
        // Eight corners always yield a box
        let mut out = Self::from_point(corners[0]);
        for c in &corners[1..] {
            out = out.expanded_to(*c);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn test_new_orders_corners() {
        let b = Aabb3::new(Vec3::new(1.0, -2.0, 3.0), Vec3::new(-1.0, 2.0, 0.0));
        assert_eq!(b.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(b.max, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(b.size(), Vec3::new(2.0, 4.0, 3.0));
        assert_eq!(b.center(), Vec3::new(0.0, 0.0, 1.5));
        assert_eq!(b.max_extent(), 4.0);
    }

    #[test]
    fn test_from_points() {
        assert!(Aabb3::from_points(std::iter::empty()).is_none());

        let b = Aabb3::from_points([
            Vec3::new(0.0, 1.0, 2.0),
            Vec3::new(-3.0, 4.0, 0.5),
            Vec3::new(1.0, -1.0, 1.0),
        ])
        .unwrap();
        assert_eq!(b.min, Vec3::new(-3.0, -1.0, 0.5));
        assert_eq!(b.max, Vec3::new(1.0, 4.0, 2.0));
    }

    #[test]
    fn test_transformed_rotation_grows_box() {
        let b = Aabb3::from_center_size(Vec3::ZERO, Vec3::new(2.0, 2.0, 2.0));
        let rot = Affine3A::from_quat(Quat::from_rotation_y(std::f32::consts::FRAC_PI_4));
        let t = b.transformed(&rot);
        let expected = 2.0_f32.sqrt();
        assert!((t.max.x - expected).abs() < 1e-5);
        assert!((t.max.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_translated() {
        let b = Aabb3::new(Vec3::ZERO, Vec3::ONE).translated(Vec3::new(5.0, 0.0, -1.0));
        assert_eq!(b.min, Vec3::new(5.0, 0.0, -1.0));
        assert_eq!(b.max, Vec3::new(6.0, 1.0, 0.0));
    }
}
