use anyhow::{format_err, Result};
use nalgebra_sparse::CsrMatrix;
use num_complex::Complex64;
use std::iter::zip;

use crate::d_ibr_dv::{d_ibr_mag_d_v, i_br, I_MAG_STEP};
use crate::d_sbr_dv::{d_sbr_d_v, s_br};
use crate::debug::{format_f64_vec, format_meas_vec, format_polar_vec};
use crate::eppci::EPPCI;
use crate::math::norm_inf;
use crate::meas::MeasKind;
use crate::sbus::{d_sbus_d_v, d_vbus_d_v, s_bus};
use crate::sparse::{h_stack, select, v_stack, CCsr};
use crate::state::VoltageState;
use crate::zero_inj::ConstraintAlgebra;

/// Measurement function and Jacobian of a state estimation run.
///
/// The state vector `e` is `[angles of non-slack buses | magnitudes of all
/// buses]`. Implementations hold only the immutable run input, so every
/// call is a pure function of `e`.
pub trait MeasurementAlgebra {
    fn eppci(&self) -> &EPPCI;

    /// Decodes a state vector into bus voltages.
    fn e2v(&self, e: &[f64]) -> Result<VoltageState> {
        let eppci = self.eppci();
        VoltageState::decode(e, eppci.non_slack_buses(), eppci.delta_init()).ok_or_else(|| {
            format_err!(
                "state vector length ({}) must be num_non_slack_bus + nb ({})",
                e.len(),
                eppci.num_non_slack_bus() + eppci.n_bus()
            )
        })
    }

    /// Predicted values of the observed measurements, in the order of `z`.
    fn create_hx(&self, e: &[f64]) -> Result<Vec<f64>> {
        let eppci = self.eppci();
        let state = self.e2v(e)?;
        log::trace!("V: {}", format_polar_vec(&state.complex()));

        let hx = full_hx(eppci, &state);
        let hx: Vec<f64> = zip(hx, eppci.non_nan_meas_mask())
            .filter(|&(_, &m)| m)
            .map(|(h, _)| h)
            .collect();

        if hx.iter().any(|h| !h.is_finite()) {
            log::warn!(
                "non-finite predicted measurements: {}",
                format_meas_vec(&eppci.layout(), eppci.non_nan_meas_mask(), &hx)
            );
        } else {
            log::trace!(
                "hx: {}",
                format_meas_vec(&eppci.layout(), eppci.non_nan_meas_mask(), &hx)
            );
        }
        Ok(hx)
    }

    /// Measurement residuals `z - h(x)`.
    fn create_rx(&self, e: &[f64]) -> Result<Vec<f64>> {
        let hx = self.create_hx(e)?;
        let rx: Vec<f64> = zip(self.eppci().z(), hx).map(|(z, h)| z - h).collect();
        log::trace!("rx: {}, |rx|_inf = {:?}", format_f64_vec(&rx), norm_inf(&rx));
        Ok(rx)
    }

    /// Jacobian of `create_hx` w.r.t. the estimated state variables.
    ///
    /// Rows follow `z` and columns follow the `true` entries of the
    /// state mask `[angles of all buses | magnitudes of all buses]`.
    fn create_hx_jacobian(&self, e: &[f64]) -> Result<CsrMatrix<f64>>;

    /// Equality constraints, if this algebra provides any.
    fn constraints(&self) -> Option<&dyn ConstraintAlgebra> {
        None
    }
}

/// Every measurable quantity at the given voltages, in measurement space order.
pub fn full_hx(eppci: &EPPCI, state: &VoltageState) -> Vec<f64> {
    let v = state.complex();

    let s_bus = s_bus(eppci.y_bus(), &v);
    let (s_f, s_t) = s_br(eppci.branch(), eppci.y_f(), eppci.y_t(), &v);
    let (i_f, i_t) = i_br(eppci.y_f(), eppci.y_t(), &v);

    let mut hx = Vec::with_capacity(eppci.layout().size());
    for kind in MeasKind::ALL {
        match kind {
            MeasKind::PBus => hx.extend(s_bus.iter().map(|s| s.re)),
            MeasKind::PFrom => hx.extend(s_f.iter().map(|s| s.re)),
            MeasKind::PTo => hx.extend(s_t.iter().map(|s| s.re)),
            MeasKind::QBus => hx.extend(s_bus.iter().map(|s| s.im)),
            MeasKind::QFrom => hx.extend(s_f.iter().map(|s| s.im)),
            MeasKind::QTo => hx.extend(s_t.iter().map(|s| s.im)),
            MeasKind::VBus => hx.extend_from_slice(&state.v),
            MeasKind::IFrom => hx.extend(i_f.iter().map(|i| i.norm())),
            MeasKind::ITo => hx.extend(i_t.iter().map(|i| i.norm())),
        }
    }
    hx
}

/// Partial derivatives of one block of the measurement space.
pub(crate) struct JacobianBlock {
    pub kind: MeasKind,
    pub d_va: CsrMatrix<f64>,
    pub d_vm: CsrMatrix<f64>,
}

/// Derivatives of every measurable quantity w.r.t. the angles and magnitudes
/// of all buses, in measurement space order. Current magnitude blocks are
/// only formed if the run has current measurements.
pub(crate) fn jacobian_blocks(eppci: &EPPCI, v: &[Complex64], i_mag_step: f64) -> Vec<JacobianBlock> {
    let (d_sbus_d_va, d_sbus_d_vm) = d_sbus_d_v(eppci.y_bus(), v);
    let (d_sf_d_va, d_sf_d_vm, d_st_d_va, d_st_d_vm) =
        d_sbr_d_v(eppci.branch(), eppci.y_f(), eppci.y_t(), v);
    let (d_v_d_va, d_v_d_vm) = d_vbus_d_v(v.len());

    let d_ibr = if eppci.any_i_meas() {
        let (d_if_d_va, d_if_d_vm, d_it_d_va, d_it_d_vm) =
            d_ibr_mag_d_v(eppci.y_f(), eppci.y_t(), v, i_mag_step);
        vec![(d_if_d_va, d_if_d_vm), (d_it_d_va, d_it_d_vm)]
    } else {
        vec![]
    };
    let mut d_ibr = d_ibr.into_iter();

    let mut blocks = Vec::with_capacity(MeasKind::ALL.len());
    for kind in MeasKind::ALL {
        let (d_va, d_vm) = match kind {
            MeasKind::PBus => (d_sbus_d_va.real(), d_sbus_d_vm.real()),
            MeasKind::PFrom => (d_sf_d_va.real(), d_sf_d_vm.real()),
            MeasKind::PTo => (d_st_d_va.real(), d_st_d_vm.real()),
            MeasKind::QBus => (d_sbus_d_va.imag(), d_sbus_d_vm.imag()),
            MeasKind::QFrom => (d_sf_d_va.imag(), d_sf_d_vm.imag()),
            MeasKind::QTo => (d_st_d_va.imag(), d_st_d_vm.imag()),
            MeasKind::VBus => (d_v_d_va.clone(), d_v_d_vm.clone()),
            MeasKind::IFrom | MeasKind::ITo => match d_ibr.next() {
                Some(d) => d,
                None => continue,
            },
        };
        blocks.push(JacobianBlock { kind, d_va, d_vm });
    }
    blocks
}

/// Standard AC measurement algebra with the full sparse Jacobian.
#[derive(Debug, Clone)]
pub struct BaseAlgebra {
    eppci: EPPCI,
    i_mag_step: f64,
}

impl BaseAlgebra {
    pub fn new(eppci: EPPCI) -> Self {
        Self::with_i_mag_step(eppci, I_MAG_STEP)
    }

    /// Uses `step` to differentiate current magnitudes.
    pub fn with_i_mag_step(eppci: EPPCI, step: f64) -> Self {
        Self {
            eppci,
            i_mag_step: step,
        }
    }

    pub fn i_mag_step(&self) -> f64 {
        self.i_mag_step
    }
}

impl MeasurementAlgebra for BaseAlgebra {
    fn eppci(&self) -> &EPPCI {
        &self.eppci
    }

    fn create_hx_jacobian(&self, e: &[f64]) -> Result<CsrMatrix<f64>> {
        let state = self.e2v(e)?;
        let v = state.complex();

        let blocks = jacobian_blocks(&self.eppci, &v, self.i_mag_step);
        let rows = blocks
            .iter()
            .map(|b| h_stack(&[&b.d_va, &b.d_vm]))
            .collect::<Result<Vec<_>>>()?;
        let jac = v_stack(&rows.iter().collect::<Vec<_>>())?;

        let jac = select(
            &jac,
            Some(self.eppci.non_nan_meas_selector().as_slice()),
            Some(self.eppci.delta_v_bus_selector().as_slice()),
        )?;
        log::debug!(
            "H: {}x{}, nnz = {}",
            jac.nrows(),
            jac.ncols(),
            jac.nnz()
        );
        Ok(jac)
    }
}
