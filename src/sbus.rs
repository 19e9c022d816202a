use crate::math::J;
use crate::sparse::{with_diagonal, CCsr};
use nalgebra::DVector;
use nalgebra_sparse::CsrMatrix;
use num_complex::Complex64;
use std::iter::zip;

/// Complex bus power injections, `V .* conj(Ybus * V)`.
pub fn s_bus(y_bus: &CsrMatrix<Complex64>, v: &[Complex64]) -> Vec<Complex64> {
    let i_bus = y_bus * &DVector::from_column_slice(v);
    zip(v, i_bus.iter()).map(|(v, i)| *v * i.conj()).collect()
}

/// Computes partial derivatives of power injection w.r.t. voltage.
///
/// Returns two matrices containing partial derivatives of the complex bus
/// power injections w.r.t voltage angle and voltage magnitude, respectively
/// (for all buses), in polar coordinates.
pub fn d_sbus_d_v(
    y_bus: &CsrMatrix<Complex64>,
    v: &[Complex64],
) -> (CsrMatrix<Complex64>, CsrMatrix<Complex64>) {
    let i_bus = y_bus * &DVector::from_column_slice(v);
    let v_norm: Vec<Complex64> = v.iter().map(|v| *v / v.norm()).collect();

    let diag_v = with_diagonal(v);
    let diag_i_bus = with_diagonal(i_bus.as_slice());
    let diag_v_norm = with_diagonal(&v_norm);

    // dSbus/dVa = 1j * diagV * conj(diagIbus - Ybus * diagV)
    // dSbus/dVm = diagV * conj(Ybus * diagVnorm) + conj(diagIbus) * diagVnorm

    let d_sbus_d_va = &diag_v * (&diag_i_bus - y_bus * &diag_v).conj() * J;
    let d_sbus_d_vm = &diag_v * (y_bus * &diag_v_norm).conj() + diag_i_bus.conj() * &diag_v_norm;

    (d_sbus_d_va, d_sbus_d_vm)
}

/// Partial derivatives of bus voltage magnitudes w.r.t. voltage angle
/// (all zero) and voltage magnitude (identity).
pub fn d_vbus_d_v(nb: usize) -> (CsrMatrix<f64>, CsrMatrix<f64>) {
    (CsrMatrix::zeros(nb, nb), CsrMatrix::identity(nb))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{meshed4, polar};
    use anyhow::{format_err, Result};
    use nalgebra::DMatrix;

    #[test]
    fn test_s_bus_dense() -> Result<()> {
        let case = meshed4();
        let adm = crate::make_ybus(case.base_mva, &case.bus, &case.branch);
        let v = polar(&case.vm, &case.va);

        let s = s_bus(&adm.y_bus, &v);
        let i_bus = DMatrix::from(&adm.y_bus) * DVector::from_column_slice(&v);
        assert_eq!(s.len(), v.len());
        for (k, s_k) in s.iter().enumerate() {
            let expected = v[k] * i_bus[k].conj();
            if (s_k - expected).norm() > 1e-12 {
                return Err(format_err!("bus {}: {} vs dense {}", k, s_k, expected));
            }
        }
        Ok(())
    }

    #[test]
    fn test_d_sbus_d_v_finite_difference() -> Result<()> {
        let case = meshed4();
        let adm = crate::make_ybus(case.base_mva, &case.bus, &case.branch);
        let (vm, va) = (case.vm.clone(), case.va.clone());
        let v = polar(&vm, &va);

        let (d_va, d_vm) = d_sbus_d_v(&adm.y_bus, &v);
        let (d_va, d_vm) = (DMatrix::from(&d_va), DMatrix::from(&d_vm));

        let h = 1e-7;
        for k in 0..vm.len() {
            let mut va_p = va.clone();
            va_p[k] += h;
            let mut vm_p = vm.clone();
            vm_p[k] += h;

            let s0 = s_bus(&adm.y_bus, &v);
            let s_va = s_bus(&adm.y_bus, &polar(&vm, &va_p));
            let s_vm = s_bus(&adm.y_bus, &polar(&vm_p, &va));

            for i in 0..vm.len() {
                let fd_va = (s_va[i] - s0[i]) / h;
                let fd_vm = (s_vm[i] - s0[i]) / h;
                if (fd_va - d_va[(i, k)]).norm() > 1e-4 || (fd_vm - d_vm[(i, k)]).norm() > 1e-4 {
                    return Err(format_err!(
                        "dSbus/dV mismatch at ({}, {}): dVa {} vs {}, dVm {} vs {}",
                        i,
                        k,
                        d_va[(i, k)],
                        fd_va,
                        d_vm[(i, k)],
                        fd_vm
                    ));
                }
            }
        }
        Ok(())
    }
}
