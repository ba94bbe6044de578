//! `std::ops` sugar over the explicit `TrackedQuantity` methods.
//!
//! Operators between two quantities can fail, on a dimension mismatch for
//! `+`/`-` and on exponent overflow for `*`/`/`, so their `Output` is a
//! `Result`. Scalar operators are infallible.
use super::tracked::TrackedQuantity;
use crate::error::DimensionalityError;
use std::ops::{Add, Div, Mul, Neg, Sub};

impl Add<&TrackedQuantity> for &TrackedQuantity {
    type Output = Result<TrackedQuantity, DimensionalityError>;

    fn add(self, rhs: &TrackedQuantity) -> Self::Output {
        self.try_add(rhs)
    }
}

impl Add for TrackedQuantity {
    type Output = Result<TrackedQuantity, DimensionalityError>;

    fn add(self, rhs: TrackedQuantity) -> Self::Output {
        self.try_add(&rhs)
    }
}

impl Sub<&TrackedQuantity> for &TrackedQuantity {
    type Output = Result<TrackedQuantity, DimensionalityError>;

    fn sub(self, rhs: &TrackedQuantity) -> Self::Output {
        self.try_sub(rhs)
    }
}

impl Sub for TrackedQuantity {
    type Output = Result<TrackedQuantity, DimensionalityError>;

    fn sub(self, rhs: TrackedQuantity) -> Self::Output {
        self.try_sub(&rhs)
    }
}

impl Mul<&TrackedQuantity> for &TrackedQuantity {
    type Output = Result<TrackedQuantity, DimensionalityError>;

    fn mul(self, rhs: &TrackedQuantity) -> Self::Output {
        self.multiply(rhs)
    }
}

impl Mul for TrackedQuantity {
    type Output = Result<TrackedQuantity, DimensionalityError>;

    fn mul(self, rhs: TrackedQuantity) -> Self::Output {
        self.multiply(&rhs)
    }
}

impl Div<&TrackedQuantity> for &TrackedQuantity {
    type Output = Result<TrackedQuantity, DimensionalityError>;

    fn div(self, rhs: &TrackedQuantity) -> Self::Output {
        self.divide(rhs)
    }
}

impl Div for TrackedQuantity {
    type Output = Result<TrackedQuantity, DimensionalityError>;

    fn div(self, rhs: TrackedQuantity) -> Self::Output {
        self.divide(&rhs)
    }
}

impl Mul<f64> for &TrackedQuantity {
    type Output = TrackedQuantity;

    fn mul(self, rhs: f64) -> TrackedQuantity {
        self.mul_scalar(rhs)
    }
}

impl Mul<f64> for TrackedQuantity {
    type Output = TrackedQuantity;

    fn mul(self, rhs: f64) -> TrackedQuantity {
        self.mul_scalar(rhs)
    }
}

impl Mul<TrackedQuantity> for f64 {
    type Output = TrackedQuantity;

    fn mul(self, rhs: TrackedQuantity) -> TrackedQuantity {
        rhs.mul_scalar(self)
    }
}

impl Div<f64> for &TrackedQuantity {
    type Output = TrackedQuantity;

    fn div(self, rhs: f64) -> TrackedQuantity {
        self.div_scalar(rhs)
    }
}

impl Div<f64> for TrackedQuantity {
    type Output = TrackedQuantity;

    fn div(self, rhs: f64) -> TrackedQuantity {
        self.div_scalar(rhs)
    }
}

impl Neg for &TrackedQuantity {
    type Output = TrackedQuantity;

    fn neg(self) -> TrackedQuantity {
        self.mul_scalar(-1.0)
    }
}

impl Neg for TrackedQuantity {
    type Output = TrackedQuantity;

    fn neg(self) -> TrackedQuantity {
        self.mul_scalar(-1.0)
    }
}
