use crate::case::{Branch, Bus};
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use num_complex::Complex64;
use std::f64::consts::PI;

/// Bus and branch admittance matrices of a network.
#[derive(Debug, Clone)]
pub struct Admittance {
    /// Maps bus voltages to bus current injections (nb x nb).
    pub y_bus: CsrMatrix<Complex64>,
    /// Maps bus voltages to branch currents at the "from" end (nl x nb).
    pub y_f: CsrMatrix<Complex64>,
    /// Maps bus voltages to branch currents at the "to" end (nl x nb).
    pub y_t: CsrMatrix<Complex64>,
}

impl Default for Admittance {
    fn default() -> Self {
        Self {
            y_bus: CsrMatrix::zeros(0, 0),
            y_f: CsrMatrix::zeros(0, 0),
            y_t: CsrMatrix::zeros(0, 0),
        }
    }
}

/// Builds the bus admittance matrix and branch admittance matrices.
///
/// Bus numbers must be consecutive beginning at 0 (i.e. internal ordering).
/// Out-of-service branches keep their rows in `Yf` and `Yt`, with zero
/// admittance, so that branch indexes stay aligned with the branch table.
pub fn make_ybus(base_mva: f64, bus: &[Bus], branch: &[Branch]) -> Admittance {
    let nb = bus.len();
    let nl = branch.len();

    // For each branch, compute the elements of the branch admittance matrix where:
    //
    //      | If |   | Yff  Yft |   | Vf |
    //      |    | = |          | * |    |
    //      | It |   | Ytf  Ytt |   | Vt |
    let mut y_bus = CooMatrix::new(nb, nb);
    let mut y_f = CooMatrix::new(nl, nb);
    let mut y_t = CooMatrix::new(nl, nb);

    for (i, br) in branch.iter().enumerate() {
        let y_s = br.y_s(); // series admittance
        let b_c = if br.is_on() { br.br_b } else { 0.0 }; // line charging susceptance
        let t = if br.tap == 0.0 { 1.0 } else { br.tap }; // default tap ratio = 1
        let tap = Complex64::from_polar(t, br.shift * PI / 180.0); // add phase shifters

        let y_tt = y_s + Complex64::new(0.0, b_c / 2.0);
        let y_ff = y_tt / (tap * tap.conj());
        let y_ft = -y_s / tap.conj();
        let y_tf = -y_s / tap;

        let (f, t) = (br.f_bus, br.t_bus);

        y_f.push(i, f, y_ff);
        y_f.push(i, t, y_ft);

        y_t.push(i, f, y_tf);
        y_t.push(i, t, y_tt);

        y_bus.push(f, f, y_ff);
        y_bus.push(f, t, y_ft);
        y_bus.push(t, f, y_tf);
        y_bus.push(t, t, y_tt);
    }

    for (i, b) in bus.iter().enumerate() {
        let y_sh = b.y_sh(base_mva);
        if y_sh != Complex64::default() {
            y_bus.push(i, i, y_sh);
        }
    }

    Admittance {
        y_bus: CsrMatrix::from(&y_bus),
        y_f: CsrMatrix::from(&y_f),
        y_t: CsrMatrix::from(&y_t),
    }
}
