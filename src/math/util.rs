use super::{Point2d, Vector2d};
use cgmath::prelude::*;

/// Projects a point onto a local coordinate system.
///
/// # Parameters
/// * `point` - The point to project
/// * `origin` - The origin of the coordinate system
/// * `x_axis` - The basis vector pointing in the positive x-axis.
/// * `y_axis` - The basis vector pointing in the positive y-axis.
pub fn project_local(
    point: Point2d,
    origin: Point2d,
    x_axis: Vector2d,
    y_axis: Vector2d,
) -> Point2d {
    let point = point - origin;
    Point2d::new(point.dot(x_axis), point.dot(y_axis))
}

/// Rotates a vector 90 degrees anti-clockwise, giving the left-hand normal of a heading.
pub fn rot90(vec: Vector2d) -> Vector2d {
    Vector2d::new(-vec.y, vec.x)
}

/// Normalises a vector, returning `None` for a (near) zero vector.
pub fn try_normalize(vec: Vector2d) -> Option<Vector2d> {
    let mag = vec.magnitude();
    (mag > 1e-9).then(|| vec / mag)
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn left_normal_of_north_is_west() {
        let left = rot90(Vector2d::new(0.0, 1.0));
        assert_approx_eq!(left.x, -1.0);
        assert_approx_eq!(left.y, 0.0);
    }

    #[test]
    fn local_projection() {
        let p = project_local(
            Point2d::new(3.0, 5.0),
            Point2d::new(1.0, 1.0),
            Vector2d::new(1.0, 0.0),
            Vector2d::new(0.0, 1.0),
        );
        assert_approx_eq!(p.x, 2.0);
        assert_approx_eq!(p.y, 4.0);
        assert!(try_normalize(Vector2d::new(0.0, 0.0)).is_none());
    }
}
