pub mod constraints;
pub mod runner;
pub mod strategies;
pub mod types;

pub use constraints::*;
pub use runner::*;
pub use strategies::*;
pub use types::*;
