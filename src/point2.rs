use std::ops::{Add, Mul, Sub};

/// A position on the plane, also used as a direction vector.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl std::fmt::Display for Point2 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(x: {}, y: {})", self.x, self.y)
    }
}

impl Point2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point2) -> f64 {
        (*other - *self).length()
    }

    pub fn midpoint(&self, other: &Point2) -> Point2 {
        (*self + *other) * 0.5
    }

    pub fn dot(&self, other: &Point2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    pub fn length(&self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    /// Cosine of the angle between two vectors, `None` if either has no length.
    pub fn cosine_to(&self, other: &Point2) -> Option<f64> {
        let lengths = self.length() * other.length();
        if lengths == 0.0 {
            return None;
        }

        Some((self.dot(other) / lengths).clamp(-1.0, 1.0))
    }
}

impl Add for Point2 {
    type Output = Point2;

    fn add(self, other: Point2) -> Point2 {
        Point2::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Point2 {
    type Output = Point2;

    fn sub(self, other: Point2) -> Point2 {
        Point2::new(self.x - other.x, self.y - other.y)
    }
}

impl Mul<f64> for Point2 {
    type Output = Point2;

    fn mul(self, scale: f64) -> Point2 {
        Point2::new(self.x * scale, self.y * scale)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn distance_is_euclidean() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(3.0, 4.0);

        assert_eq!(5.0, a.distance_to(&b));
        assert_eq!(5.0, b.distance_to(&a));
    }

    #[test]
    fn cosine_of_perpendicular_vectors_is_zero() {
        let right = Point2::new(1.0, 0.0);
        let up = Point2::new(0.0, 2.0);

        assert_eq!(Some(0.0), right.cosine_to(&up));
        assert_eq!(Some(-1.0), right.cosine_to(&(right * -3.0)));
    }

    #[test]
    fn cosine_with_zero_vector_is_undefined() {
        assert_eq!(None, Point2::default().cosine_to(&Point2::new(1.0, 1.0)));
    }
}
