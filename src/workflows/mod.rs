//! Secondary endpoints built on the same upstream client

pub mod character;
pub mod product;
pub mod style_plan;
