//! Row layout of loaded models on the ground plane

use glam::Vec3;

use crate::bounds::Aabb3;

/// Something with world bounds that can be moved
pub trait Placeable {
    /// Current world-space bounds
    fn world_bounds(&self) -> Aabb3;
    /// Move by `offset` in world space
    fn translate(&mut self, offset: Vec3);
    /// Store the bounds computed after the final move
    fn set_bounds(&mut self, bounds: Aabb3);
}

/// Lay `items` out left to right along +X, each resting on y = 0.
///
/// Items keep their order. Each one is centered on the origin, dropped onto
/// the ground, then shifted so its box starts at the running cursor. The
/// cursor advances by the item's X extent plus `gap`. Returns the union of
/// the final boxes, or `None` when there is nothing to arrange.
pub fn arrange_row<P: Placeable>(items: &mut [P], gap: f32) -> Option<Aabb3> {
    if items.is_empty() {
        return None;
    }

    let mut cursor_x = 0.0;

    for item in items.iter_mut() {
        let bounds = item.world_bounds();
        let size = bounds.size();

        item.translate(-bounds.center());

        let centered = item.world_bounds();
        item.translate(Vec3::new(0.0, -centered.min.y, 0.0));

        item.translate(Vec3::new(cursor_x + size.x / 2.0, 0.0, 0.0));
        cursor_x += size.x + gap;

        let placed = item.world_bounds();
        item.set_bounds(placed);
    }

    items
        .iter()
        .map(Placeable::world_bounds)
        .reduce(|acc, b| acc.union(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    struct TestBox {
        local: Aabb3,
        offset: Vec3,
        stored: Option<Aabb3>,
    }

    impl TestBox {
        fn new(center: Vec3, size: Vec3) -> Self {
            Self {
                local: Aabb3::from_center_size(center, size),
                offset: Vec3::ZERO,
                stored: None,
            }
        }
    }

    impl Placeable for TestBox {
        fn world_bounds(&self) -> Aabb3 {
            self.local.translated(self.offset)
        }

        fn translate(&mut self, offset: Vec3) {
            self.offset += offset;
        }

        fn set_bounds(&mut self, bounds: Aabb3) {
            self.stored = Some(bounds);
        }
    }

    #[test]
    fn test_empty_is_noop() {
        let mut items: Vec<TestBox> = Vec::new();
        assert!(arrange_row(&mut items, 1.0).is_none());
    }

    #[test]
    fn test_single_model_centered_and_grounded() {
        let mut items = vec![TestBox::new(Vec3::new(10.0, 5.0, -3.0), Vec3::new(2.0, 4.0, 6.0))];
        let union = arrange_row(&mut items, 1.0).unwrap();

        let b = items[0].stored.unwrap();
        assert!((b.min.y).abs() < EPS);
        assert!((b.min.x).abs() < EPS);
        assert!((b.center().x - 1.0).abs() < EPS);
        assert!((b.center().z).abs() < EPS);
        assert_eq!(union, b);
    }

    #[test]
    fn test_two_models_example_positions() {
        let mut items = vec![
            TestBox::new(Vec3::new(-7.0, 3.0, 1.0), Vec3::new(2.0, 1.0, 1.0)),
            TestBox::new(Vec3::new(4.0, -2.0, 9.0), Vec3::new(3.0, 2.0, 1.0)),
        ];
        arrange_row(&mut items, 1.0).unwrap();

        let a = items[0].stored.unwrap();
        let b = items[1].stored.unwrap();
        assert!((a.center().x - 1.0).abs() < EPS);
        assert!((b.center().x - 4.5).abs() < EPS);
    }

    #[test]
    fn test_row_invariants() {
        let sizes = [
            Vec3::new(0.5, 3.0, 2.0),
            Vec3::new(4.0, 0.25, 1.0),
            Vec3::new(1.5, 1.5, 8.0),
            Vec3::new(10.0, 2.0, 0.1),
        ];
        let mut items: Vec<TestBox> = sizes
            .iter()
            .enumerate()
            .map(|(i, s)| TestBox::new(Vec3::new(i as f32 * 3.0, -(i as f32), i as f32), *s))
            .collect();

        let union = arrange_row(&mut items, 1.0).unwrap();

        for item in &items {
            let b = item.stored.unwrap();
            assert!(b.min.y.abs() < EPS, "min y {}", b.min.y);
            assert_eq!(b, item.world_bounds());
        }

        for pair in items.windows(2) {
            let left = pair[0].stored.unwrap();
            let right = pair[1].stored.unwrap();
            assert!(left.max.x <= right.min.x);
            assert!((right.min.x - left.max.x - 1.0).abs() < EPS);
        }

        // Row starts at x = 0 and spans every extent plus the gaps
        let total: f32 = sizes.iter().map(|s| s.x).sum::<f32>() + (sizes.len() - 1) as f32;
        assert!(union.min.x.abs() < EPS);
        assert!((union.max.x - total).abs() < EPS);
        assert!((union.center().x - total / 2.0).abs() < EPS);
    }

    #[test]
    fn test_rearranging_is_stable() {
        let mut items = vec![
            TestBox::new(Vec3::ZERO, Vec3::ONE),
            TestBox::new(Vec3::new(3.0, 3.0, 3.0), Vec3::new(2.0, 2.0, 2.0)),
        ];
        let first = arrange_row(&mut items, 1.0).unwrap();
        let second = arrange_row(&mut items, 1.0).unwrap();
        assert!((first.min - second.min).length() < EPS);
        assert!((first.max - second.max).length() < EPS);
    }
}
