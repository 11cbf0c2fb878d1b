use super::Point2d;
use std::f64::consts::PI;

/// Equatorial radius used by spherical mercator, in m.
const EARTH_RADIUS: f64 = 6378137.0;

/// Converts latitude/longitude into the local render frame.
///
/// The core only deals in node IDs and lat/lon; anything that needs positions is handed
/// an implementation of this trait.
pub trait Projection {
    /// Projects a coordinate into local x (east) / y (north) metres.
    fn to_local(&self, lat: f64, lon: f64) -> Point2d;
}

impl<F: Fn(f64, f64) -> Point2d> Projection for F {
    fn to_local(&self, lat: f64, lon: f64) -> Point2d {
        self(lat, lon)
    }
}

/// Spherical mercator projection relative to a centre coordinate, scaled by the cosine of the
/// latitude so distances come out roughly in metres near the centre.
#[derive(Clone, Copy, Debug)]
pub struct WebMercator {
    centre: (f64, f64),
}

impl WebMercator {
    /// Creates a projection centred on the given coordinate.
    pub fn centred_on(lat: f64, lon: f64) -> Self {
        Self {
            centre: lat_lon_to_meters(lat, lon),
        }
    }
}

impl Projection for WebMercator {
    fn to_local(&self, lat: f64, lon: f64) -> Point2d {
        let (x, y) = lat_lon_to_meters(lat, lon);
        let scale = f64::cos(lat.abs().to_radians());
        Point2d::new((x - self.centre.0) * scale, (y - self.centre.1) * scale)
    }
}

/// Converts a coordinate into spherical mercator metres.
fn lat_lon_to_meters(lat: f64, lon: f64) -> (f64, f64) {
    let origin_shift = PI * EARTH_RADIUS;
    let x = lon * origin_shift / 180.0;
    let y = f64::ln(f64::tan((90.0 + lat) * PI / 360.0)) / (PI / 180.0);
    (x, y * origin_shift / 180.0)
}
