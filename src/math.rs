//! Mathematical structs and functions.

use cgmath::{Point2, Vector2};
pub use bearing::{bearing, Direction};
pub use projection::{Projection, WebMercator};
pub use util::*;

mod bearing;
mod projection;
mod util;

/// A 2D point in the local render frame, x pointing east and y pointing north.
pub type Point2d = Point2<f64>;

/// A 2D vector in the local render frame.
pub type Vector2d = Vector2<f64>;
