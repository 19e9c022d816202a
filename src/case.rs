use num_complex::Complex64;

#[derive(Debug, Default, PartialEq, Copy, Clone)]
pub enum BusType {
    /// Fixed active and reactive power.
    #[default]
    PQ = 1,
    /// Fixed voltage magnitude and active power.
    PV = 2,
    /// Reference voltage angle. Slack active and reactive power.
    REF = 3,
    /// Isolated bus.
    NONE = 4,
}

/// Bus is a node in the power system graph structure.
///
/// Bus numbers must be consecutive beginning at 0 (i.e. internal ordering).
#[derive(Debug, Clone, PartialEq)]
pub struct Bus {
    /// Bus number.
    pub bus_i: usize,

    pub bus_type: BusType,

    /// Shunt conductance (MW at V = 1.0 p.u.).
    pub gs: f64,

    /// Shunt susceptance (MVAr at V = 1.0 p.u.).
    pub bs: f64,

    /// Voltage magnitude (p.u.).
    pub vm: f64,

    /// Voltage angle (degrees).
    pub va: f64,

    /// Base voltage (kV).
    pub base_kv: f64,
}

impl Default for Bus {
    fn default() -> Self {
        Self {
            bus_i: 0,
            bus_type: BusType::PQ,
            gs: 0.0,
            bs: 0.0,
            vm: 1.0,
            va: 0.0,
            base_kv: 1.0,
        }
    }
}

impl Bus {
    pub fn new(bus_i: usize, bus_type: BusType) -> Self {
        Self {
            bus_i,
            bus_type,
            ..Default::default()
        }
    }

    pub fn is_ref(&self) -> bool {
        self.bus_type == BusType::REF
    }

    pub(crate) fn y_sh(&self, base_mva: f64) -> Complex64 {
        Complex64::new(self.gs, self.bs) / Complex64::new(base_mva, 0.0)
    }
}

/// Branch represents either a transmission line/cable or a two winding
/// transformer.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    /// From bus number.
    pub f_bus: usize,

    /// To bus number.
    pub t_bus: usize,

    /// Resistance (p.u.).
    pub br_r: f64,

    /// Reactance (p.u.).
    pub br_x: f64,

    /// Total line charging susceptance (p.u.).
    pub br_b: f64,

    /// Transformer off nominal tap ratio.
    pub tap: f64,

    /// Transformer phase shift angle (degrees).
    pub shift: f64,

    /// Initial branch status.
    pub br_status: bool,
}

impl Default for Branch {
    fn default() -> Self {
        Self {
            f_bus: 0,
            t_bus: 0,
            br_r: 0.0,
            br_x: 0.0,
            br_b: 0.0,
            tap: 0.0,
            shift: 0.0,
            br_status: true,
        }
    }
}

impl Branch {
    pub fn new(f_bus: usize, t_bus: usize, br_r: f64, br_x: f64, br_b: f64) -> Self {
        Self {
            f_bus,
            t_bus,
            br_r,
            br_x,
            br_b,
            ..Default::default()
        }
    }

    pub fn is_on(&self) -> bool {
        self.br_status
    }

    /// Series admittance, zero if the branch is out of service.
    pub(crate) fn y_s(&self) -> Complex64 {
        if !self.is_on() {
            Complex64::new(0.0, 0.0)
        } else {
            Complex64::new(1.0, 0.0) / Complex64::new(self.br_r, self.br_x)
        }
    }
}
