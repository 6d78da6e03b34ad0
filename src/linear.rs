//! Support for linear algebra and least-squares regression.

pub mod matrix;
pub mod regression;
