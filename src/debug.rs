use num_complex::Complex64;
use pretty_dtoa::{dtoa, FmtFloatConfig};
use std::f64::consts::PI;

use crate::math::flat_nonzero;
use crate::meas::MeasLayout;

const FLOAT_CONFIG: FmtFloatConfig = FmtFloatConfig::default()
    .add_point_zero(false)
    .max_significant_digits(9);

pub fn format_f64_vec(v: &[f64]) -> String {
    let a: Vec<String> = v.iter().map(|f| dtoa(*f, FLOAT_CONFIG)).collect();
    format!("[{}]", a.join(", "))
}

fn format_polar(z: &Complex64) -> String {
    format!(
        "{}\u{2220}{}\u{00B0}",
        dtoa(z.norm(), FLOAT_CONFIG),
        dtoa(z.arg() * 180.0 / PI, FLOAT_CONFIG)
    )
}

pub fn format_polar_vec(v: &[Complex64]) -> String {
    let a: Vec<String> = v.iter().map(format_polar).collect();
    format!("[{}]", a.join(", "))
}

/// Formats observed measurement values labelled with their kind and element,
/// e.g. `[pf1=0.5, v0=1.02]`. Values are in the order of `z`.
pub fn format_meas_vec(layout: &MeasLayout, mask: &[bool], values: &[f64]) -> String {
    let a: Vec<String> = flat_nonzero(mask)
        .into_iter()
        .zip(values)
        .map(|(slot, &x)| match layout.kind_of(slot) {
            Some((kind, element)) => format!("{}{}={}", kind, element, dtoa(x, FLOAT_CONFIG)),
            None => format!("?{}={}", slot, dtoa(x, FLOAT_CONFIG)),
        })
        .collect();
    format!("[{}]", a.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_f64_vec() {
        assert_eq!(format_f64_vec(&[1.0, 0.5, -2.25]), "[1, 0.5, -2.25]");
    }

    #[test]
    fn test_format_polar_vec() {
        let v = [Complex64::new(0.0, 2.0)];
        assert_eq!(format_polar_vec(&v), "[2\u{2220}90\u{00B0}]");
    }

    #[test]
    fn test_format_meas_vec() {
        let layout = MeasLayout::new(2, 1);
        let mut mask = vec![false; layout.size()];
        mask[2] = true; // pf0
        mask[9] = true; // v1
        assert_eq!(format_meas_vec(&layout, &mask, &[0.5, 1.02]), "[pf0=0.5, v1=1.02]");
    }
}
