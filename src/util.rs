//! Miscellaneous utility structs and functions.

use cgmath::num_traits::Float;
use std::fmt::Debug;

/// An interval on the real number line.
#[derive(Copy, Clone, Default, PartialEq, Eq)]
pub struct Interval<T> {
    pub min: T,
    pub max: T,
}

impl<T> Interval<T> {
    /// Creates a new interval.
    pub const fn new(min: T, max: T) -> Self {
        Self { min, max }
    }
}

impl<T: std::cmp::PartialOrd> Interval<T> {
    /// Returns true if this interval contains the value.
    pub fn contains(&self, value: T) -> bool {
        value >= self.min && value <= self.max
    }
}

impl<T: Float> Interval<T> {
    /// Creates the degenerate interval containing only `value`.
    pub fn point(value: T) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    /// Grows the interval so it contains `value`.
    pub fn expand(&mut self, value: T) {
        self.min = T::min(self.min, value);
        self.max = T::max(self.max, value);
    }

    /// Returns the centre/mid-point of the interval.
    pub fn midpoint(&self) -> T {
        T::from(0.5).unwrap_or_else(T::zero) * (self.min + self.max)
    }

    /// Returns true if the value lies strictly between the ends of the interval.
    pub fn contains_exclusive(&self, value: T) -> bool {
        value > self.min && value < self.max
    }
}

impl<T: Debug> Debug for Interval<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Interval({:?}, {:?})", &self.min, &self.max)
    }
}
