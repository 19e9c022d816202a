use crate::case::{Branch, Bus};
use crate::math::flat_nonzero;
use crate::meas::{MeasLayout, MeasurementSet};
use crate::ybus::{make_ybus, Admittance};
use derive_builder::Builder;
use nalgebra_sparse::CsrMatrix;
use num_complex::Complex64;

/// Indexes of all buses that are not the reference bus, in bus order.
pub fn non_slack_buses(bus: &[Bus]) -> Vec<usize> {
    bus.iter()
        .enumerate()
        .filter(|(_, b)| !b.is_ref())
        .map(|(i, _)| i)
        .collect()
}

/// Mask over the full state space `[angles of all buses | magnitudes of all buses]`
/// marking the entries that are estimated.
///
/// Reference bus angles are never estimated. The magnitudes of the buses
/// in `fixed_v` are held at their initial value.
pub fn state_mask(bus: &[Bus], fixed_v: &[usize]) -> Vec<bool> {
    let angles = bus.iter().map(|b| !b.is_ref());
    let magnitudes = (0..bus.len()).map(|i| !fixed_v.contains(&i));
    angles.chain(magnitudes).collect()
}

/// Input to one state estimation run.
///
/// Bus numbers must be consecutive beginning at 0 (i.e. internal ordering)
/// and all quantities are in per unit with radians for voltage angles.
/// The admittance matrices are built once, when the builder completes.
#[derive(Debug, Clone, Builder)]
#[builder(build_fn(name = "pre_build", validate = "Self::validate"))]
pub struct EPPCI {
    base_mva: f64,
    bus: Vec<Bus>,
    branch: Vec<Branch>,

    /// Observed slots of the full measurement space.
    non_nan_meas_mask: Vec<bool>,
    /// Measured values, in measurement space order.
    z: Vec<f64>,
    /// Measurement variances.
    r_cov: Vec<f64>,

    #[builder(default)]
    non_slack_buses: Vec<usize>,
    #[builder(default)]
    delta_v_bus_mask: Vec<bool>,
    #[builder(default)]
    v_init: Vec<f64>,
    #[builder(default)]
    delta_init: Vec<f64>,
    #[builder(default)]
    any_i_meas: bool,

    #[builder(setter(skip))]
    adm: Admittance,
}

impl EPPCIBuilder {
    /// Sets the mask, measured values, variances and the current
    /// measurement flag from a measurement set.
    pub fn measurements(&mut self, meas: &MeasurementSet) -> &mut Self {
        self.non_nan_meas_mask = Some(meas.non_nan_meas_mask());
        self.z = Some(meas.z());
        self.r_cov = Some(meas.r_cov());
        self.any_i_meas = Some(meas.any_i_meas());
        self
    }

    pub fn build(&self) -> Result<EPPCI, EPPCIBuilderError> {
        let mut eppci = self.pre_build()?;
        let bus = &eppci.bus;

        if self.non_slack_buses.is_none() {
            eppci.non_slack_buses = non_slack_buses(bus);
        }
        if self.delta_v_bus_mask.is_none() {
            // angles of the estimated buses, all magnitudes
            let mut mask = vec![false; bus.len()];
            eppci.non_slack_buses.iter().for_each(|&i| mask[i] = true);
            mask.resize(2 * bus.len(), true);
            eppci.delta_v_bus_mask = mask;
        }
        if self.v_init.is_none() {
            eppci.v_init = bus.iter().map(|b| b.vm).collect();
        }
        if self.delta_init.is_none() {
            eppci.delta_init = bus.iter().map(|b| b.va.to_radians()).collect();
        }
        if self.any_i_meas.is_none() {
            eppci.any_i_meas = eppci.layout().observes_current(&eppci.non_nan_meas_mask);
        }

        eppci.adm = make_ybus(eppci.base_mva, &eppci.bus, &eppci.branch);

        log::debug!(
            "eppci: nb = {}, nl = {}, meas = {}, state = {}, any_i_meas = {}",
            eppci.n_bus(),
            eppci.n_branch(),
            eppci.z.len(),
            eppci.delta_v_bus_selector().len(),
            eppci.any_i_meas
        );
        Ok(eppci)
    }

    fn validate(&self) -> Result<(), String> {
        let (bus, branch) = match (&self.bus, &self.branch) {
            (Some(bus), Some(branch)) => (bus, branch),
            _ => return Ok(()), // reported as uninitialized by pre_build
        };
        let nb = bus.len();
        let nl = branch.len();
        let layout = MeasLayout::new(nb, nl);

        if let Some((l, br)) = branch
            .iter()
            .enumerate()
            .find(|(_, br)| br.f_bus >= nb || br.t_bus >= nb)
        {
            return Err(format!(
                "branch {} ({} -> {}) refers to a bus outside 0..{}",
                l, br.f_bus, br.t_bus, nb
            ));
        }

        if let Some(mask) = &self.non_nan_meas_mask {
            if mask.len() != layout.size() {
                return Err(format!(
                    "measurement mask length ({}) must be 3*nb + 6*nl ({})",
                    mask.len(),
                    layout.size()
                ));
            }
            let count = mask.iter().filter(|&&m| m).count();
            if let Some(z) = &self.z {
                if z.len() != count {
                    return Err(format!(
                        "z length ({}) must match observed measurement count ({})",
                        z.len(),
                        count
                    ));
                }
            }
            if let Some(r_cov) = &self.r_cov {
                if r_cov.len() != count {
                    return Err(format!(
                        "r_cov length ({}) must match observed measurement count ({})",
                        r_cov.len(),
                        count
                    ));
                }
            }
            if self.any_i_meas == Some(false) && layout.observes_current(mask) {
                return Err("current measurements observed but any_i_meas is false".to_string());
            }
        }

        let non_slack = match &self.non_slack_buses {
            Some(non_slack) => {
                if non_slack.windows(2).any(|w| w[0] >= w[1]) {
                    return Err("non-slack buses must be strictly increasing".to_string());
                }
                if let Some(&i) = non_slack.iter().find(|&&i| i >= nb) {
                    return Err(format!("non-slack bus {} outside 0..{}", i, nb));
                }
                non_slack.clone()
            }
            None => non_slack_buses(bus),
        };

        if let Some(mask) = &self.delta_v_bus_mask {
            if mask.len() != 2 * nb {
                return Err(format!(
                    "state mask length ({}) must be 2*nb ({})",
                    mask.len(),
                    2 * nb
                ));
            }
            if let Some(i) = flat_nonzero(&mask[..nb])
                .into_iter()
                .find(|i| !non_slack.contains(i))
            {
                return Err(format!("state mask estimates the angle of slack bus {}", i));
            }
        }

        for (name, init) in [("v_init", &self.v_init), ("delta_init", &self.delta_init)] {
            if let Some(init) = init {
                if init.len() != nb {
                    return Err(format!("{} length ({}) must be nb ({})", name, init.len(), nb));
                }
            }
        }
        Ok(())
    }
}

impl EPPCI {
    pub fn base_mva(&self) -> f64 {
        self.base_mva
    }
    pub fn bus(&self) -> &[Bus] {
        &self.bus
    }
    pub fn branch(&self) -> &[Branch] {
        &self.branch
    }
    pub fn n_bus(&self) -> usize {
        self.bus.len()
    }
    pub fn n_branch(&self) -> usize {
        self.branch.len()
    }
    pub fn layout(&self) -> MeasLayout {
        MeasLayout::new(self.bus.len(), self.branch.len())
    }

    pub fn y_bus(&self) -> &CsrMatrix<Complex64> {
        &self.adm.y_bus
    }
    pub fn y_f(&self) -> &CsrMatrix<Complex64> {
        &self.adm.y_f
    }
    pub fn y_t(&self) -> &CsrMatrix<Complex64> {
        &self.adm.y_t
    }

    pub fn non_nan_meas_mask(&self) -> &[bool] {
        &self.non_nan_meas_mask
    }
    pub fn z(&self) -> &[f64] {
        &self.z
    }
    pub fn r_cov(&self) -> &[f64] {
        &self.r_cov
    }
    pub fn any_i_meas(&self) -> bool {
        self.any_i_meas
    }

    pub fn non_slack_buses(&self) -> &[usize] {
        &self.non_slack_buses
    }
    pub fn num_non_slack_bus(&self) -> usize {
        self.non_slack_buses.len()
    }
    pub fn delta_v_bus_mask(&self) -> &[bool] {
        &self.delta_v_bus_mask
    }
    pub fn v_init(&self) -> &[f64] {
        &self.v_init
    }
    pub fn delta_init(&self) -> &[f64] {
        &self.delta_init
    }

    /// Indexes of the observed measurement slots.
    pub fn non_nan_meas_selector(&self) -> Vec<usize> {
        flat_nonzero(&self.non_nan_meas_mask)
    }

    /// Indexes of the estimated state variables.
    pub fn delta_v_bus_selector(&self) -> Vec<usize> {
        flat_nonzero(&self.delta_v_bus_mask)
    }

    /// Initial state vector `[delta_init[non_slack] | v_init]`.
    pub fn e_init(&self) -> Vec<f64> {
        self.non_slack_buses
            .iter()
            .map(|&i| self.delta_init[i])
            .chain(self.v_init.iter().copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meas::{MeasKind, Measurement};
    use crate::tests::{meshed4, radial3};
    use anyhow::{format_err, Result};

    fn radial3_meas() -> Result<MeasurementSet> {
        let mut meas = MeasurementSet::new(3, 2);
        meas.push(Measurement::new(MeasKind::VBus, 0, 1.0, 0.01))?
            .push(Measurement::new(MeasKind::PBus, 2, -0.4, 0.02))?;
        Ok(meas)
    }

    #[test]
    fn test_build_defaults() -> Result<()> {
        let mut case = radial3();
        case.bus[2].va = -3.0;
        let eppci = EPPCIBuilder::default()
            .base_mva(case.base_mva)
            .bus(case.bus)
            .branch(case.branch)
            .measurements(&radial3_meas()?)
            .build()?;

        assert_eq!(eppci.non_slack_buses(), &[1, 2]);
        assert_eq!(eppci.num_non_slack_bus(), 2);
        assert_eq!(
            eppci.delta_v_bus_mask(),
            &[false, true, true, true, true, true]
        );
        assert_eq!(eppci.non_nan_meas_selector(), vec![2, 14]);
        assert_eq!(eppci.z(), &[-0.4, 1.0]);
        assert!(!eppci.any_i_meas());
        assert_eq!(eppci.y_bus().nrows(), 3);
        assert_eq!(eppci.y_f().nrows(), 2);

        let e = eppci.e_init();
        assert_eq!(e.len(), 5);
        if (e[1] + 3f64.to_radians()).abs() > 1e-15 {
            return Err(format_err!("delta_init must be in radians, got {}", e[1]));
        }
        Ok(())
    }

    #[test]
    fn test_build_custom_non_slack() -> Result<()> {
        let case = radial3();
        let eppci = EPPCIBuilder::default()
            .base_mva(case.base_mva)
            .bus(case.bus)
            .branch(case.branch)
            .non_slack_buses(vec![2])
            .measurements(&radial3_meas()?)
            .build()?;

        assert_eq!(
            eppci.delta_v_bus_mask(),
            &[false, false, true, true, true, true]
        );
        let e = eppci.e_init();
        if eppci.delta_v_bus_selector().len() != e.len() {
            return Err(format_err!(
                "{} state columns for {} state variables",
                eppci.delta_v_bus_selector().len(),
                e.len()
            ));
        }
        Ok(())
    }

    #[test]
    fn test_non_slack_buses_pv() {
        // PV buses keep their angle in the state
        let case = meshed4();
        assert_eq!(non_slack_buses(&case.bus), vec![1, 2, 3]);
        assert_eq!(
            state_mask(&case.bus, &[1]),
            vec![false, true, true, true, true, false, true, true]
        );
    }

    #[test]
    fn test_state_mask_fixed_voltage() {
        let case = radial3();
        assert_eq!(
            state_mask(&case.bus, &[0]),
            vec![false, true, true, false, true, true]
        );
    }

    #[test]
    fn test_build_errors() -> Result<()> {
        let case = radial3();
        let base = || {
            let mut b = EPPCIBuilder::default();
            b.base_mva(case.base_mva)
                .bus(case.bus.clone())
                .branch(case.branch.clone())
                .non_nan_meas_mask(vec![false; 3 * 3 + 6 * 2])
                .z(vec![])
                .r_cov(vec![]);
            b
        };
        assert!(base().build().is_ok());

        // wrong mask length
        assert!(base().non_nan_meas_mask(vec![false; 20]).build().is_err());

        // z does not match the mask
        assert!(base().z(vec![1.0]).build().is_err());

        // slack angle estimated
        assert!(base().delta_v_bus_mask(vec![true; 6]).build().is_err());

        // wrong initial voltage length
        assert!(base().v_init(vec![1.0; 2]).build().is_err());

        // current observed without the flag
        let mut mask = vec![false; 21];
        mask[19] = true;
        assert!(base()
            .non_nan_meas_mask(mask)
            .z(vec![0.1])
            .r_cov(vec![1e-4])
            .any_i_meas(false)
            .build()
            .is_err());

        // branch refers to a missing bus
        let mut branch = case.branch.clone();
        branch[1].t_bus = 3;
        assert!(base().branch(branch).build().is_err());

        // missing field
        assert!(EPPCIBuilder::default().base_mva(100.0).build().is_err());
        Ok(())
    }
}
