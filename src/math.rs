// Copyright (c) 2022-2024, Richard Lincoln. All rights reserved.

use num_complex::Complex64;

pub const J: Complex64 = Complex64 { re: 0.0, im: 1.0 };

#[macro_export]
macro_rules! cmplx {
    () => {
        num_complex::Complex64::new(0.0, 0.0)
    };
    ($arg1:expr) => {
        num_complex::Complex64::new($arg1, 0.0)
    };
    ($arg1:expr, $arg2:expr) => {
        num_complex::Complex64::new($arg1, $arg2)
    };
}

/// Indices of the `true` entries of `mask`, in ascending order.
pub fn flat_nonzero(mask: &[bool]) -> Vec<usize> {
    mask.iter()
        .enumerate()
        .filter(|&(_, &m)| m)
        .map(|(i, _)| i)
        .collect()
}

/// Computes the infinity norm: `max(abs(a))`
pub fn norm_inf(a: &[f64]) -> Option<f64> {
    if a.is_empty() {
        return None;
    }
    Some(a.iter().fold(0.0, |max: f64, v| max.max(v.abs())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_nonzero() {
        assert_eq!(flat_nonzero(&[false, true, true, false, true]), vec![1, 2, 4]);
        assert!(flat_nonzero(&[false, false]).is_empty());
    }

    #[test]
    fn test_norm_inf() {
        assert_eq!(norm_inf(&[]), None);
        assert_eq!(norm_inf(&[1.0, -3.5, 2.0]), Some(3.5));
    }
}
