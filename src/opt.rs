use crate::algebra::{BaseAlgebra, MeasurementAlgebra};
use crate::d_ibr_dv::I_MAG_STEP;
use crate::decoupled::DecoupledAlgebra;
use crate::eppci::EPPCI;
use crate::zero_inj::ZeroInjAlgebra;

#[derive(Debug, Default, PartialEq, Copy, Clone)]
pub enum Alg {
    /// Weighted least squares.
    #[default]
    WLS = 0,
    /// Weighted least squares with a decoupled Jacobian.
    WLSDecoupled = 1,
    /// Weighted least squares with zero-injection equality constraints.
    WLSZeroInj = 2,
}

/// State estimation options.
#[derive(Debug, Clone)]
pub struct SEOpt {
    pub algorithm: Alg,

    // Perturbation step used to differentiate branch current magnitudes.
    // Default value is 1e-5.
    pub i_mag_step: f64,
}

impl Default for SEOpt {
    fn default() -> Self {
        Self {
            algorithm: Alg::WLS,
            i_mag_step: I_MAG_STEP,
        }
    }
}

/// Creates the measurement algebra for the selected algorithm.
pub fn new_algebra(eppci: EPPCI, opt: &SEOpt) -> Box<dyn MeasurementAlgebra> {
    log::debug!("algorithm: {:?}, i_mag_step: {}", opt.algorithm, opt.i_mag_step);
    match opt.algorithm {
        Alg::WLS => Box::new(BaseAlgebra::with_i_mag_step(eppci, opt.i_mag_step)),
        Alg::WLSDecoupled => Box::new(DecoupledAlgebra::with_i_mag_step(eppci, opt.i_mag_step)),
        Alg::WLSZeroInj => Box::new(ZeroInjAlgebra::with_i_mag_step(eppci, opt.i_mag_step)),
    }
}
