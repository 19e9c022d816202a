use anyhow::{format_err, Result};
use nalgebra_sparse::CsrMatrix;

use crate::algebra::{BaseAlgebra, MeasurementAlgebra};
use crate::d_ibr_dv::I_MAG_STEP;
use crate::eppci::EPPCI;
use crate::sbus::{d_sbus_d_v, s_bus};
use crate::sparse::{h_stack, select, v_stack, CCsr};

/// Equality constraints for constrained state estimation.
pub trait ConstraintAlgebra: MeasurementAlgebra {
    /// Active power injections at `p_zero_inj` followed by reactive power
    /// injections at `q_zero_inj`, in MW/MVAr.
    fn create_cx(&self, e: &[f64], p_zero_inj: &[usize], q_zero_inj: &[usize]) -> Result<Vec<f64>>;

    /// Jacobian of the per unit constraint values w.r.t. the estimated state
    /// variables. Every constraint row is kept.
    fn create_cx_jacobian(
        &self,
        e: &[f64],
        p_zero_inj: &[usize],
        q_zero_inj: &[usize],
    ) -> Result<CsrMatrix<f64>>;
}

/// Base measurement algebra with zero-injection constraints.
#[derive(Debug, Clone)]
pub struct ZeroInjAlgebra {
    base: BaseAlgebra,
}

impl ZeroInjAlgebra {
    pub fn new(eppci: EPPCI) -> Self {
        Self::with_i_mag_step(eppci, I_MAG_STEP)
    }

    pub fn with_i_mag_step(eppci: EPPCI, step: f64) -> Self {
        Self {
            base: BaseAlgebra::with_i_mag_step(eppci, step),
        }
    }

    fn check_buses(&self, buses: &[usize]) -> Result<()> {
        let nb = self.eppci().n_bus();
        match buses.iter().find(|&&i| i >= nb) {
            Some(i) => Err(format_err!("zero-injection bus {} outside 0..{}", i, nb)),
            None => Ok(()),
        }
    }
}

impl MeasurementAlgebra for ZeroInjAlgebra {
    fn eppci(&self) -> &EPPCI {
        self.base.eppci()
    }

    fn create_hx_jacobian(&self, e: &[f64]) -> Result<CsrMatrix<f64>> {
        self.base.create_hx_jacobian(e)
    }

    fn constraints(&self) -> Option<&dyn ConstraintAlgebra> {
        Some(self)
    }
}

impl ConstraintAlgebra for ZeroInjAlgebra {
    fn create_cx(&self, e: &[f64], p_zero_inj: &[usize], q_zero_inj: &[usize]) -> Result<Vec<f64>> {
        self.check_buses(p_zero_inj)?;
        self.check_buses(q_zero_inj)?;

        let eppci = self.eppci();
        let v = self.e2v(e)?.complex();
        let s_bus = s_bus(eppci.y_bus(), &v);

        let base_mva = eppci.base_mva();
        let p = p_zero_inj.iter().map(|&i| s_bus[i].re * base_mva);
        let q = q_zero_inj.iter().map(|&i| s_bus[i].im * base_mva);
        Ok(p.chain(q).collect())
    }

    fn create_cx_jacobian(
        &self,
        e: &[f64],
        p_zero_inj: &[usize],
        q_zero_inj: &[usize],
    ) -> Result<CsrMatrix<f64>> {
        let eppci = self.eppci();
        let v = self.e2v(e)?.complex();
        let (d_sbus_d_va, d_sbus_d_vm) = d_sbus_d_v(eppci.y_bus(), &v);

        let c_jac_th = v_stack(&[
            &select(&d_sbus_d_va.real(), Some(p_zero_inj), None)?,
            &select(&d_sbus_d_va.imag(), Some(q_zero_inj), None)?,
        ])?;
        let c_jac_v = v_stack(&[
            &select(&d_sbus_d_vm.real(), Some(p_zero_inj), None)?,
            &select(&d_sbus_d_vm.imag(), Some(q_zero_inj), None)?,
        ])?;
        let c_jac = h_stack(&[&c_jac_th, &c_jac_v])?;

        select(&c_jac, None, Some(eppci.delta_v_bus_selector().as_slice()))
    }
}
