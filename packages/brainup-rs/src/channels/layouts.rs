use crate::error::{BrainupError, Result};
use crate::montage::positions::{electrode_position, ElectrodePosition};

/// Named electrode template, ordered as it is assigned to recordings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelLayout {
    pub name: &'static str,
    pub description: &'static str,
    pub labels: &'static [&'static str],
}

impl ChannelLayout {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labels paired with their positions, in template order.
    pub fn electrodes(&self) -> Vec<ElectrodePosition> {
        self.labels
            .iter()
            .filter_map(|label| electrode_position(label))
            .collect()
    }
}

const LAYOUT_10_20_21: &[&str] = &[
    "Fp1", "Fp2", "F7", "F3", "Fz", "F4", "F8", "T3", "C3", "Cz", "C4", "T4", "T5", "P3", "Pz",
    "P4", "T6", "O1", "O2", "A1", "A2",
];

const LAYOUT_10_10_70: &[&str] = &[
    "Fp1", "Fpz", "Fp2", "AF7", "AF3", "AF4", "AF8", "F9", "F7", "F5", "F3", "F1", "Fz",
    "F2", "F4", "F6", "F8", "F10", "FT9", "FT7", "FC5", "FC3", "FC1", "FCz", "FC2", "FC4", "FC6",
    "FT8", "FT10", "T9", "T7", "C5", "C3", "C1", "Cz", "C2", "C4", "C6", "T8", "T10", "TP9",
    "TP7", "CP5", "CP3", "CP1", "CPz", "CP2", "CP4", "CP6", "TP8", "TP10", "P9", "P7", "P5",
    "P3", "P1", "Pz", "P2", "P4", "P6", "P8", "P10", "PO7", "PO3", "POz", "PO4", "PO8", "O1",
    "Oz", "O2",
];

const LAYOUT_10_10_68: &[&str] = &[
    "Fp1", "Fpz", "Fp2", "AF7", "AF3", "AF4", "AF8", "F9", "F7", "F5", "F3", "F1", "Fz",
    "F2", "F4", "F6", "F8", "F10", "FT9", "FT7", "FC5", "FC3", "FC1", "FCz", "FC2", "FC4", "FC6",
    "FT8", "FT10", "T7", "C5", "C3", "C1", "Cz", "C2", "C4", "C6", "T8", "TP9", "TP7", "CP5",
    "CP3", "CP1", "CPz", "CP2", "CP4", "CP6", "TP8", "TP10", "P9", "P7", "P5", "P3", "P1", "Pz",
    "P2", "P4", "P6", "P8", "P10", "PO7", "PO3", "POz", "PO4", "PO8", "O1", "Oz", "O2",
];

static LAYOUTS: &[ChannelLayout] = &[
    ChannelLayout {
        name: "10-20-21",
        description: "International 10-20 system with ear references (21 electrodes)",
        labels: LAYOUT_10_20_21,
    },
    ChannelLayout {
        name: "10-10-68",
        description: "Extended 10-10 system without T9/T10 (68 electrodes)",
        labels: LAYOUT_10_10_68,
    },
    ChannelLayout {
        name: "10-10-70",
        description: "Extended 10-10 system (70 electrodes)",
        labels: LAYOUT_10_10_70,
    },
];

pub fn available_layouts() -> &'static [ChannelLayout] {
    LAYOUTS
}

/// Case-insensitive lookup by template name.
pub fn layout(name: &str) -> Result<&'static ChannelLayout> {
    LAYOUTS
        .iter()
        .find(|l| l.name.eq_ignore_ascii_case(name.trim()))
        .ok_or_else(|| BrainupError::UnknownLayout(name.to_string()))
}
