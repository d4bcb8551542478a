//! Second-moment shape analysis of pixel sets.
//!
//! A uniformly filled ellipse with semi-axes `a >= b` has covariance
//! eigenvalues `a²/4` and `b²/4`; [`PrincipalAxes::semi_axes`] inverts that
//! relation. The 2×2 eigen problem is solved in closed form.

use nalgebra::{Matrix2, Point2, Vector2};

/// Mean of a set of points, `None` for an empty set.
pub fn centroid<I>(points: I) -> Option<Point2<f32>>
where
    I: IntoIterator<Item = Point2<f32>>,
{
    let mut n = 0usize;
    let mut sx = 0.0f64;
    let mut sy = 0.0f64;
    for p in points {
        sx += p.x as f64;
        sy += p.y as f64;
        n += 1;
    }
    if n == 0 {
        return None;
    }
    Some(Point2::new((sx / n as f64) as f32, (sy / n as f64) as f32))
}

/// Population covariance of `points` around `mean`.
pub fn covariance<I>(points: I, mean: Point2<f32>) -> Option<Matrix2<f32>>
where
    I: IntoIterator<Item = Point2<f32>>,
{
    let mut n = 0usize;
    let (mut sxx, mut sxy, mut syy) = (0.0f64, 0.0f64, 0.0f64);
    for p in points {
        let dx = (p.x - mean.x) as f64;
        let dy = (p.y - mean.y) as f64;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
        n += 1;
    }
    if n == 0 {
        return None;
    }
    let n = n as f64;
    Some(Matrix2::new(
        (sxx / n) as f32,
        (sxy / n) as f32,
        (sxy / n) as f32,
        (syy / n) as f32,
    ))
}

/// Eigen decomposition of a symmetric 2×2 covariance matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PrincipalAxes {
    /// Eigenvalues, largest first. Never negative.
    pub eigenvalues: [f32; 2],
    /// Unit eigenvector of the largest eigenvalue.
    pub major_direction: Vector2<f32>,
}

impl PrincipalAxes {
    /// Closed-form decomposition; only the symmetric part of `cov` is read.
    pub fn from_covariance(cov: &Matrix2<f32>) -> Self {
        let a = cov[(0, 0)];
        let b = 0.5 * (cov[(0, 1)] + cov[(1, 0)]);
        let c = cov[(1, 1)];

        let trace = a + c;
        let det = a * c - b * b;
        let disc = (trace * trace - 4.0 * det).max(0.0).sqrt();
        let l0 = ((trace + disc) * 0.5).max(0.0);
        let l1 = ((trace - disc) * 0.5).max(0.0);

        // Both rows of (A - l0 I) give a candidate; the longer one is better conditioned.
        let v_row0 = Vector2::new(-b, a - l0);
        let v_row1 = Vector2::new(l0 - c, b);
        let v = if v_row0.norm_squared() >= v_row1.norm_squared() {
            v_row0
        } else {
            v_row1
        };
        let norm = v.norm();
        let major_direction = if norm > f32::EPSILON * trace.abs().max(1.0) {
            v / norm
        } else {
            Vector2::x()
        };

        Self {
            eigenvalues: [l0, l1],
            major_direction,
        }
    }

    /// Semi-axis lengths `[major, minor]` of the equivalent filled ellipse.
    #[inline]
    pub fn semi_axes(&self) -> [f32; 2] {
        [
            2.0 * self.eigenvalues[0].sqrt(),
            2.0 * self.eigenvalues[1].sqrt(),
        ]
    }

    /// Angle of the major axis in radians, in `(-π, π]`.
    #[inline]
    pub fn major_angle(&self) -> f32 {
        self.major_direction.y.atan2(self.major_direction.x)
    }
}
