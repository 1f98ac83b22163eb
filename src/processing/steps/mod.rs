//! Individual processing steps

pub mod median;
pub mod noise;
