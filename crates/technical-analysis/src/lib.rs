pub mod indicators;
pub mod prediction;


pub use indicators::*;
pub use prediction::*;
