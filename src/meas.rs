use anyhow::{format_err, Result};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of a measured quantity. The declaration order is the block order
/// of the full measurement space.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Copy, Clone)]
pub enum MeasKind {
    /// Active power injection at a bus.
    PBus,
    /// Active power flow at the "from" end of a branch.
    PFrom,
    /// Active power flow at the "to" end of a branch.
    PTo,
    /// Reactive power injection at a bus.
    QBus,
    /// Reactive power flow at the "from" end of a branch.
    QFrom,
    /// Reactive power flow at the "to" end of a branch.
    QTo,
    /// Voltage magnitude at a bus.
    VBus,
    /// Current magnitude at the "from" end of a branch.
    IFrom,
    /// Current magnitude at the "to" end of a branch.
    ITo,
}

impl MeasKind {
    pub const ALL: [MeasKind; 9] = [
        MeasKind::PBus,
        MeasKind::PFrom,
        MeasKind::PTo,
        MeasKind::QBus,
        MeasKind::QFrom,
        MeasKind::QTo,
        MeasKind::VBus,
        MeasKind::IFrom,
        MeasKind::ITo,
    ];

    /// True for quantities indexed by bus, false for those indexed by branch.
    pub fn is_bus(&self) -> bool {
        matches!(self, MeasKind::PBus | MeasKind::QBus | MeasKind::VBus)
    }

    pub fn is_active_power(&self) -> bool {
        matches!(self, MeasKind::PBus | MeasKind::PFrom | MeasKind::PTo)
    }

    pub fn is_reactive_power(&self) -> bool {
        matches!(self, MeasKind::QBus | MeasKind::QFrom | MeasKind::QTo)
    }

    pub fn is_current(&self) -> bool {
        matches!(self, MeasKind::IFrom | MeasKind::ITo)
    }
}

impl fmt::Display for MeasKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MeasKind::PBus => "p",
            MeasKind::PFrom => "pf",
            MeasKind::PTo => "pt",
            MeasKind::QBus => "q",
            MeasKind::QFrom => "qf",
            MeasKind::QTo => "qt",
            MeasKind::VBus => "v",
            MeasKind::IFrom => "if",
            MeasKind::ITo => "it",
        };
        write!(f, "{}", s)
    }
}

/// Position of every possible measurement in the full measurement space
/// of a network with `nb` buses and `nl` branches.
#[derive(Debug, PartialEq, Copy, Clone)]
pub struct MeasLayout {
    pub nb: usize,
    pub nl: usize,
}

impl MeasLayout {
    pub fn new(nb: usize, nl: usize) -> Self {
        Self { nb, nl }
    }

    /// Number of elements in the block of the given kind.
    pub fn block_len(&self, kind: MeasKind) -> usize {
        if kind.is_bus() {
            self.nb
        } else {
            self.nl
        }
    }

    /// Index of the first slot of the block of the given kind.
    pub fn offset(&self, kind: MeasKind) -> usize {
        MeasKind::ALL
            .iter()
            .take_while(|&&k| k != kind)
            .map(|&k| self.block_len(k))
            .sum()
    }

    /// Size of the full measurement space, `3*nb + 6*nl`.
    pub fn size(&self) -> usize {
        MeasKind::ALL.iter().map(|&k| self.block_len(k)).sum()
    }

    /// Flat index of the measurement of `kind` at bus/branch `element`.
    pub fn slot(&self, kind: MeasKind, element: usize) -> Result<usize> {
        let len = self.block_len(kind);
        if element >= len {
            return Err(format_err!(
                "{} measurement element {} out of range (0..{})",
                kind,
                element,
                len
            ));
        }
        Ok(self.offset(kind) + element)
    }

    /// Whether a full-space mask observes any current magnitude.
    pub fn observes_current(&self, mask: &[bool]) -> bool {
        MeasKind::ALL
            .iter()
            .filter(|kind| kind.is_current())
            .any(|&kind| {
                let offset = self.offset(kind);
                mask.iter().skip(offset).take(self.block_len(kind)).any(|&m| m)
            })
    }

    /// Inverse of `slot`.
    pub fn kind_of(&self, slot: usize) -> Option<(MeasKind, usize)> {
        let mut offset = 0;
        for kind in MeasKind::ALL {
            let len = self.block_len(kind);
            if slot < offset + len {
                return Some((kind, slot - offset));
            }
            offset += len;
        }
        None
    }
}

/// A single measurement, in per unit.
#[derive(Debug, PartialEq, Copy, Clone)]
pub struct Measurement {
    pub kind: MeasKind,
    /// Bus index for bus quantities, branch index for branch quantities.
    pub element: usize,
    pub value: f64,
    pub std_dev: f64,
}

impl Measurement {
    pub fn new(kind: MeasKind, element: usize, value: f64, std_dev: f64) -> Self {
        Self {
            kind,
            element,
            value,
            std_dev,
        }
    }
}

/// Measurements of one estimation run, ordered by their position in the
/// full measurement space.
#[derive(Debug, Clone)]
pub struct MeasurementSet {
    layout: MeasLayout,
    meas: BTreeMap<usize, Measurement>,
}

impl MeasurementSet {
    pub fn new(nb: usize, nl: usize) -> Self {
        Self {
            layout: MeasLayout::new(nb, nl),
            meas: BTreeMap::new(),
        }
    }

    pub fn layout(&self) -> MeasLayout {
        self.layout
    }

    /// Adds a measurement. At most one measurement per slot is allowed.
    pub fn push(&mut self, m: Measurement) -> Result<&mut Self> {
        let slot = self.layout.slot(m.kind, m.element)?;
        if self.meas.contains_key(&slot) {
            return Err(format_err!(
                "duplicate {} measurement at element {}",
                m.kind,
                m.element
            ));
        }
        self.meas.insert(slot, m);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.meas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meas.is_empty()
    }

    /// Measurements in canonical order (the order of `z`).
    pub fn iter(&self) -> impl Iterator<Item = &Measurement> {
        self.meas.values()
    }

    /// Boolean mask over the full measurement space.
    pub fn non_nan_meas_mask(&self) -> Vec<bool> {
        let mut mask = vec![false; self.layout.size()];
        self.meas.keys().for_each(|&slot| mask[slot] = true);
        mask
    }

    /// Measured values in canonical order.
    pub fn z(&self) -> Vec<f64> {
        self.meas.values().map(|m| m.value).collect()
    }

    /// Measurement variances in canonical order.
    pub fn r_cov(&self) -> Vec<f64> {
        self.meas.values().map(|m| m.std_dev * m.std_dev).collect()
    }

    /// Whether any current magnitude is measured.
    pub fn any_i_meas(&self) -> bool {
        self.meas.values().any(|m| m.kind.is_current())
    }
}
