use crate::math::J;
use crate::sparse::with_diagonal;
use nalgebra::DVector;
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use num_complex::Complex64;

/// Perturbation step used to differentiate branch current magnitudes.
pub const I_MAG_STEP: f64 = 1e-5;

/// Complex branch currents at the "from" and "to" ends, `Yf * V` and `Yt * V`.
pub fn i_br(
    y_f: &CsrMatrix<Complex64>,
    y_t: &CsrMatrix<Complex64>,
    v: &[Complex64],
) -> (Vec<Complex64>, Vec<Complex64>) {
    let v = DVector::from_column_slice(v);
    let i_f = y_f * &v;
    let i_t = y_t * &v;
    (i_f.as_slice().to_vec(), i_t.as_slice().to_vec())
}

/// Computes partial derivatives of branch currents w.r.t. voltage.
///
/// Returns `(dIf/dVa, dIf/dVm, dIt/dVa, dIt/dVm)` in polar coordinates.
pub fn d_ibr_d_v(
    y_f: &CsrMatrix<Complex64>,
    y_t: &CsrMatrix<Complex64>,
    v: &[Complex64],
) -> (
    CsrMatrix<Complex64>,
    CsrMatrix<Complex64>,
    CsrMatrix<Complex64>,
    CsrMatrix<Complex64>,
) {
    let v_norm: Vec<Complex64> = v.iter().map(|v| *v / v.norm()).collect();

    let diag_v = with_diagonal(v);
    let diag_v_norm = with_diagonal(&v_norm);

    let d_if_d_va = y_f * &diag_v * J;
    let d_if_d_vm = y_f * &diag_v_norm;
    let d_it_d_va = y_t * &diag_v * J;
    let d_it_d_vm = y_t * &diag_v_norm;

    (d_if_d_va, d_if_d_vm, d_it_d_va, d_it_d_vm)
}

/// Partial derivatives of branch current magnitudes w.r.t. voltage.
///
/// `|I|` is not complex differentiable, so each entry is approximated by a
/// forward difference along the complex derivative direction:
/// `(|I + step * dI| - |I|) / step`. Entries where `dI` is structurally zero
/// are exactly zero and stay out of the sparsity pattern.
///
/// Returns `(d|If|/dVa, d|If|/dVm, d|It|/dVa, d|It|/dVm)`.
pub fn d_ibr_mag_d_v(
    y_f: &CsrMatrix<Complex64>,
    y_t: &CsrMatrix<Complex64>,
    v: &[Complex64],
    step: f64,
) -> (CsrMatrix<f64>, CsrMatrix<f64>, CsrMatrix<f64>, CsrMatrix<f64>) {
    let (i_f, i_t) = i_br(y_f, y_t, v);
    let (d_if_d_va, d_if_d_vm, d_it_d_va, d_it_d_vm) = d_ibr_d_v(y_f, y_t, v);

    (
        perturb_magnitude(&d_if_d_va, &i_f, step),
        perturb_magnitude(&d_if_d_vm, &i_f, step),
        perturb_magnitude(&d_it_d_va, &i_t, step),
        perturb_magnitude(&d_it_d_vm, &i_t, step),
    )
}

fn perturb_magnitude(d_i: &CsrMatrix<Complex64>, i_br: &[Complex64], step: f64) -> CsrMatrix<f64> {
    let mut coo = CooMatrix::new(d_i.nrows(), d_i.ncols());
    for (l, k, d) in d_i.triplet_iter() {
        let i = i_br[l];
        coo.push(l, k, ((i + d * step).norm() - i.norm()) / step);
    }
    CsrMatrix::from(&coo)
}
