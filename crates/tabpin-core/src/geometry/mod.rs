//! Rectangle algebra and transform-matrix construction.

pub mod rect;
pub mod transform;
