use std::f64::consts::PI;

/// One of the four directional buckets used by the signal cycle and by right-of-way rules.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    #[default]
    North,
    East,
    South,
    West,
}

impl Direction {
    /// All directions in phase order.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Buckets an angle in degrees: [315, 45) north, [45, 135) east,
    /// [135, 225) south and [225, 315) west.
    pub fn from_degrees(degrees: f64) -> Self {
        let degrees = degrees.rem_euclid(360.0);
        if !(45.0..315.0).contains(&degrees) {
            Direction::North
        } else if degrees < 135.0 {
            Direction::East
        } else if degrees < 225.0 {
            Direction::South
        } else {
            Direction::West
        }
    }

    /// Gets the direction with the given phase index, modulo 4.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 4]
    }

    /// The phase index of the direction, 0 to 3.
    pub fn index(self) -> usize {
        self as usize
    }

    /// The one-based ordinal of the direction (north = 1 ... west = 4), the numbering the
    /// right-of-way rules do their modular arithmetic in.
    pub fn ordinal(self) -> i32 {
        self as i32 + 1
    }
}

/// Computes the heading of travel from one coordinate to another, in degrees within [0, 360).
///
/// The easting and northing components are those of the initial great-circle bearing, combined
/// as `atan2(northing, easting)`, so the angle runs anti-clockwise from east. Map signal tags use
/// the same convention, and the direction buckets are named after it.
pub fn bearing(from_lat: f64, from_lon: f64, to_lat: f64, to_lon: f64) -> f64 {
    let (lat1, lon1) = (from_lat.to_radians(), from_lon.to_radians());
    let (lat2, lon2) = (to_lat.to_radians(), to_lon.to_radians());

    let x = f64::sin(lon2 - lon1) * f64::cos(lat2);
    let y = f64::cos(lat1) * f64::sin(lat2) - f64::sin(lat1) * f64::cos(lat2) * f64::cos(lon2 - lon1);
    let theta = f64::atan2(y, x);
    (theta * 180.0 / PI + 360.0) % 360.0
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn bucket_boundaries() {
        assert_eq!(Direction::from_degrees(0.0), Direction::North);
        assert_eq!(Direction::from_degrees(44.9), Direction::North);
        assert_eq!(Direction::from_degrees(45.0), Direction::East);
        assert_eq!(Direction::from_degrees(134.9), Direction::East);
        assert_eq!(Direction::from_degrees(135.0), Direction::South);
        assert_eq!(Direction::from_degrees(225.0), Direction::West);
        assert_eq!(Direction::from_degrees(314.9), Direction::West);
        assert_eq!(Direction::from_degrees(315.0), Direction::North);
        assert_eq!(Direction::from_degrees(360.0), Direction::North);
        assert_eq!(Direction::from_degrees(-90.0), Direction::West);
    }

    #[test]
    fn ordinals_are_one_based() {
        assert_eq!(Direction::North.ordinal(), 1);
        assert_eq!(Direction::West.ordinal(), 4);
        assert_eq!(Direction::from_index(5), Direction::East);
    }

    #[test]
    fn heading_runs_anticlockwise_from_east() {
        // Travelling east along the equator
        assert_approx_eq!(bearing(0.0, 0.0, 0.0, 0.001), 0.0);
        // Travelling north
        assert_approx_eq!(bearing(0.0, 0.0, 0.001, 0.0), 90.0);
        // Travelling west
        assert_approx_eq!(bearing(0.0, 0.001, 0.0, 0.0), 180.0);
        // Travelling south
        assert_approx_eq!(bearing(0.001, 0.0, 0.0, 0.0), 270.0);
    }
}
