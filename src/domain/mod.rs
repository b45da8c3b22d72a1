pub mod horizon;
pub mod result;
pub mod units;

pub use horizon::*;
pub use result::*;
pub use units::*;
