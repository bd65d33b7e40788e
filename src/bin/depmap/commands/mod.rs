//! Command implementations

pub mod audit;
pub mod optimize;
pub mod parse;
pub mod select;
