use crate::case::Branch;
use crate::math::J;
use crate::sparse::{with_diagonal, with_row_entries, CCsr};
use nalgebra::DVector;
use nalgebra_sparse::CsrMatrix;
use num_complex::Complex64;
use std::iter::zip;

/// Complex power flows at the "from" and "to" ends of every branch,
/// `V[f] .* conj(Yf * V)` and `V[t] .* conj(Yt * V)`.
pub fn s_br(
    branch: &[Branch],
    y_f: &CsrMatrix<Complex64>,
    y_t: &CsrMatrix<Complex64>,
    v: &[Complex64],
) -> (Vec<Complex64>, Vec<Complex64>) {
    let v_col = DVector::from_column_slice(v);
    let i_f = y_f * &v_col;
    let i_t = y_t * &v_col;

    let s_f = zip(branch, i_f.iter()).map(|(br, i)| v[br.f_bus] * i.conj()).collect();
    let s_t = zip(branch, i_t.iter()).map(|(br, i)| v[br.t_bus] * i.conj()).collect();

    (s_f, s_t)
}

/// Computes partial derivatives of branch power flows w.r.t. voltage.
///
/// Returns four matrices containing partial derivatives of the complex
/// branch power flows at the "from" and "to" ends of each branch w.r.t
/// voltage angle and voltage magnitude (for all buses), in the order
/// `(dSf/dVa, dSf/dVm, dSt/dVa, dSt/dVm)`. Each matrix is `nl x nb`.
pub fn d_sbr_d_v(
    branch: &[Branch],
    y_f: &CsrMatrix<Complex64>,
    y_t: &CsrMatrix<Complex64>,
    v: &[Complex64],
) -> (
    CsrMatrix<Complex64>,
    CsrMatrix<Complex64>,
    CsrMatrix<Complex64>,
    CsrMatrix<Complex64>,
) {
    let nb = v.len();
    let f: Vec<usize> = branch.iter().map(|br| br.f_bus).collect();
    let t: Vec<usize> = branch.iter().map(|br| br.t_bus).collect();

    let v_col = DVector::from_column_slice(v);
    let i_f = y_f * &v_col;
    let i_t = y_t * &v_col;
    let v_norm: Vec<Complex64> = v.iter().map(|v| *v / v.norm()).collect();

    let v_f: Vec<Complex64> = f.iter().map(|&i| v[i]).collect();
    let v_t: Vec<Complex64> = t.iter().map(|&i| v[i]).collect();

    let diag_v_f = with_diagonal(&v_f);
    let diag_i_f = with_diagonal(i_f.as_slice());
    let diag_v_t = with_diagonal(&v_t);
    let diag_i_t = with_diagonal(i_t.as_slice());
    let diag_v = with_diagonal(v);
    let diag_v_norm = with_diagonal(&v_norm);

    // sparse((V[f], (il, f)), (nl, nb)) and friends
    let c_v_f = with_row_entries(nb, &f, &v_f);
    let c_v_t = with_row_entries(nb, &t, &v_t);
    let c_v_norm_f = with_row_entries(nb, &f, &f.iter().map(|&i| v_norm[i]).collect::<Vec<_>>());
    let c_v_norm_t = with_row_entries(nb, &t, &t.iter().map(|&i| v_norm[i]).collect::<Vec<_>>());

    // dSf/dVa = 1j * (conj(diagIf) * Cf(Vf) - diagVf * conj(Yf * diagV))
    // dSf/dVm = diagVf * conj(Yf * diagVnorm) + conj(diagIf) * Cf(Vnorm)
    let d_sf_d_va = (diag_i_f.conj() * &c_v_f - &diag_v_f * (y_f * &diag_v).conj()) * J;
    let d_sf_d_vm =
        &diag_v_f * (y_f * &diag_v_norm).conj() + diag_i_f.conj() * &c_v_norm_f;

    let d_st_d_va = (diag_i_t.conj() * &c_v_t - &diag_v_t * (y_t * &diag_v).conj()) * J;
    let d_st_d_vm =
        &diag_v_t * (y_t * &diag_v_norm).conj() + diag_i_t.conj() * &c_v_norm_t;

    (d_sf_d_va, d_sf_d_vm, d_st_d_va, d_st_d_vm)
}
