use crate::debug::format_polar_vec;
use num_complex::Complex64;
use std::fmt;
use std::iter::zip;

/// Bus voltages in polar form, decoded from a state vector.
#[derive(Debug, Clone, PartialEq)]
pub struct VoltageState {
    /// Voltage magnitudes (p.u.), one per bus.
    pub v: Vec<f64>,
    /// Voltage angles (radians), one per bus.
    pub delta: Vec<f64>,
}

impl VoltageState {
    /// Decodes a state vector `[angles of non-slack buses | all magnitudes]`.
    ///
    /// Angles of buses outside `non_slack_buses` are taken from `delta_init`.
    /// Returns `None` if `e` is not `non_slack_buses.len() + nb` long.
    pub fn decode(e: &[f64], non_slack_buses: &[usize], delta_init: &[f64]) -> Option<Self> {
        let nb = delta_init.len();
        let n = non_slack_buses.len();
        if e.len() != n + nb {
            return None;
        }
        let mut delta = delta_init.to_vec();
        zip(non_slack_buses, &e[..n]).for_each(|(&i, &th)| delta[i] = th);

        Some(Self {
            v: e[n..].to_vec(),
            delta,
        })
    }

    /// Complex bus voltages `v * exp(j * delta)`.
    pub fn complex(&self) -> Vec<Complex64> {
        zip(&self.v, &self.delta)
            .map(|(&vm, &va)| Complex64::from_polar(vm, va))
            .collect()
    }
}

impl fmt::Display for VoltageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_polar_vec(&self.complex()))
    }
}
