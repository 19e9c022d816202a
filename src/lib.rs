mod algebra;
mod case;
mod d_ibr_dv;
mod d_sbr_dv;
mod decoupled;
mod eppci;
mod math;
mod meas;
mod opt;
mod sbus;
mod sparse;
mod state;
mod ybus;
mod zero_inj;

pub mod debug;

#[cfg(test)]
mod tests;

pub use algebra::*;
pub use case::*;
pub use d_ibr_dv::*;
pub use d_sbr_dv::*;
pub use decoupled::*;
pub use eppci::*;
pub use math::*;
pub use meas::*;
pub use opt::*;
pub use sbus::*;
pub use sparse::*;
pub use state::*;
pub use ybus::*;
pub use zero_inj::*;
