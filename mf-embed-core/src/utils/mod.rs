//! Utility functions module

pub mod color;
pub mod text;
pub mod url;
