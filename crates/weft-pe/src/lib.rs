//! Reduction primitive expressions for the Weft tensor-program compiler.
//!
//! The builders in this crate take symbolic input tensors and produce
//! symbolic result tensors; nothing here decides iteration order, tiling or
//! memory placement, and nothing executes. Scheduling and code generation
//! consume the tensors these functions return.

mod error;
mod reduction;

pub use error::*;
pub use reduction::*;
