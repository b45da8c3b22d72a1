//! File adapters around the core: the hourly input series and the result tables

pub mod export;
pub mod input;

pub use export::*;
pub use input::*;
