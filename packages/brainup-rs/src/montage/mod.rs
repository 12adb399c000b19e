//! Electrode montages and scalp topography.

pub mod positions;
pub mod topography;

pub use positions::{electrode_position, ElectrodePosition};
pub use topography::{project_topography, Topography, TopographyOptions};

use crate::channels::layout;
use crate::error::{BrainupError, Result};
use serde::Serialize;

/// Template covering every known 10-10 position.
pub const STANDARD_TEMPLATE: &str = "standard_1020";

/// Fiducials followed by the recording's electrodes in template order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Montage {
    pub template: String,
    pub fiducials: Vec<ElectrodePosition>,
    pub electrodes: Vec<ElectrodePosition>,
}

impl Montage {
    /// Digitization points: the three fiducials first, then electrodes.
    pub fn points(&self) -> impl Iterator<Item = &ElectrodePosition> {
        self.fiducials.iter().chain(self.electrodes.iter())
    }

    pub fn electrode(&self, label: &str) -> Option<&ElectrodePosition> {
        self.electrodes.iter().find(|e| e.label == label)
    }

    pub fn labels(&self) -> Vec<String> {
        self.electrodes.iter().map(|e| e.label.clone()).collect()
    }
}

pub fn attach_positions(channel_labels: &[String]) -> Result<Montage> {
    attach_positions_with(channel_labels, STANDARD_TEMPLATE)
}

/// Keep the template electrodes present in `channel_labels`, preserving
/// template order and the recording's spelling of each label.
pub fn attach_positions_with(channel_labels: &[String], template: &str) -> Result<Montage> {
    let template_labels: Vec<&'static str> = if template.eq_ignore_ascii_case(STANDARD_TEMPLATE) {
        positions::STANDARD_1020.iter().map(|(name, _, _)| *name).collect()
    } else {
        layout(template)?.labels.to_vec()
    };

    let canonical_signal: Vec<(Option<&'static str>, &String)> = channel_labels
        .iter()
        .map(|label| (positions::canonical_label(label), label))
        .collect();

    let electrodes: Vec<ElectrodePosition> = template_labels
        .iter()
        .filter_map(|name| {
            let wanted = positions::canonical_label(name)?;
            canonical_signal
                .iter()
                .find(|(canonical, _)| *canonical == Some(wanted))
                .and_then(|(_, label)| electrode_position(label))
        })
        .collect();

    if electrodes.is_empty() {
        return Err(BrainupError::UnknownLayout(format!(
            "no channel matches the '{}' template",
            template
        )));
    }

    log::debug!(
        "Montage '{}': {} of {} channels positioned",
        template,
        electrodes.len(),
        channel_labels.len()
    );

    Ok(Montage {
        template: template.to_string(),
        fiducials: positions::fiducials(),
        electrodes,
    })
}
