use anyhow::{format_err, Result};
use nalgebra::DMatrix;
use nalgebra_sparse::CsrMatrix;

use crate::algebra::{jacobian_blocks, BaseAlgebra, MeasurementAlgebra};
use crate::d_ibr_dv::I_MAG_STEP;
use crate::eppci::EPPCI;

/// Measurement algebra for the fast-decoupled method.
///
/// Measurements are predicted exactly as in [`BaseAlgebra`], but the
/// Jacobian drops the coupling of active power to voltage magnitude and
/// of reactive power to voltage angle.
#[derive(Debug, Clone)]
pub struct DecoupledAlgebra {
    base: BaseAlgebra,
}

impl DecoupledAlgebra {
    pub fn new(eppci: EPPCI) -> Self {
        Self::with_i_mag_step(eppci, I_MAG_STEP)
    }

    pub fn with_i_mag_step(eppci: EPPCI, step: f64) -> Self {
        Self {
            base: BaseAlgebra::with_i_mag_step(eppci, step),
        }
    }

    /// Decoupled Jacobian as a dense matrix.
    pub fn create_hx_jacobian_dense(&self, e: &[f64]) -> Result<DMatrix<f64>> {
        let eppci = self.eppci();
        let nb = eppci.n_bus();
        let v = self.e2v(e)?.complex();

        let blocks = jacobian_blocks(eppci, &v, self.base.i_mag_step());
        let nrows: usize = blocks.iter().map(|b| b.d_va.nrows()).sum();

        let mut jac = DMatrix::<f64>::zeros(nrows, 2 * nb);
        let mut offset = 0;
        for b in &blocks {
            let n = b.d_va.nrows();
            if !b.kind.is_reactive_power() {
                jac.view_mut((offset, 0), (n, nb))
                    .copy_from(&DMatrix::from(&b.d_va));
            }
            if !b.kind.is_active_power() {
                jac.view_mut((offset, nb), (n, nb))
                    .copy_from(&DMatrix::from(&b.d_vm));
            }
            offset += n;
        }

        let rows = eppci.non_nan_meas_selector();
        if let Some(&r) = rows.iter().find(|&&r| r >= nrows) {
            return Err(format_err!(
                "measurement slot {} has no Jacobian row ({} rows formed)",
                r,
                nrows
            ));
        }
        let cols = eppci.delta_v_bus_selector();

        let jac = jac.select_rows(rows.iter()).select_columns(cols.iter());
        log::debug!("H (decoupled): {}x{}", jac.nrows(), jac.ncols());
        Ok(jac)
    }
}

impl MeasurementAlgebra for DecoupledAlgebra {
    fn eppci(&self) -> &EPPCI {
        self.base.eppci()
    }

    fn create_hx_jacobian(&self, e: &[f64]) -> Result<CsrMatrix<f64>> {
        let jac = self.create_hx_jacobian_dense(e)?;
        Ok(CsrMatrix::from(&jac))
    }
}
