//! Channel naming: header resolution for tabular inputs and layout assignment.

pub mod layouts;

pub use layouts::{available_layouts, layout, ChannelLayout};

use crate::error::{BrainupError, Result};
use crate::types::SignalMatrix;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Outcome of inspecting a table's header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderResolution {
    pub labels: Vec<String>,
    /// The header row holds samples and must be re-inserted as data.
    pub header_is_data: bool,
}

/// Decide whether `raw_headers` are channel labels or a data row.
///
/// Any header with an alphabetic character makes the row a label row; headers
/// without letters are then named by their column index. With no letters at
/// all, every column is named by index and the row is sample data.
pub fn resolve_ambiguous(raw_headers: &[String]) -> HeaderResolution {
    let has_letters = |h: &str| h.chars().any(char::is_alphabetic);
    let any_alpha = raw_headers.iter().any(|h| has_letters(h));

    let labels = raw_headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            if any_alpha && has_letters(h) {
                h.trim().to_string()
            } else {
                i.to_string()
            }
        })
        .collect();

    HeaderResolution {
        labels,
        header_is_data: !any_alpha,
    }
}

/// How channels are renamed against a layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ChannelAssignment {
    /// Pair layout labels with the signal's channel order.
    Automatic { layout: String },
    /// Explicit `(channel index, label)` pairs.
    Manual { pairs: Vec<(usize, String)> },
}

fn synthetic_label(index: usize) -> String {
    format!("Channel {}", index + 1)
}

/// Rename the channels of `signal`, returning a new matrix with the full new
/// channel list. Samples are shared by value, never altered.
pub fn assign_layout(signal: &SignalMatrix, assignment: &ChannelAssignment) -> Result<SignalMatrix> {
    let n = signal.num_channels();

    let labels: Vec<String> = match assignment {
        ChannelAssignment::Automatic { layout: name } => {
            let template = layout(name)?;
            (0..n)
                .map(|i| {
                    template
                        .labels
                        .get(i)
                        .map(|l| l.to_string())
                        .unwrap_or_else(|| synthetic_label(i))
                })
                .collect()
        }
        ChannelAssignment::Manual { pairs } => {
            let mut labels: Vec<Option<String>> = vec![None; n];
            for (index, label) in pairs {
                match labels.get_mut(*index) {
                    Some(slot) => *slot = Some(label.trim().to_string()),
                    None => log::warn!(
                        "Ignoring assignment of '{}' to channel index {} (only {} channels)",
                        label,
                        index,
                        n
                    ),
                }
            }
            labels
                .into_iter()
                .enumerate()
                .map(|(i, l)| l.filter(|l| !l.is_empty()).unwrap_or_else(|| synthetic_label(i)))
                .collect()
        }
    };

    let mut seen = HashSet::with_capacity(labels.len());
    if let Some(dup) = labels.iter().find(|l| !seen.insert(l.as_str())) {
        return Err(BrainupError::DuplicateChannel(dup.clone()));
    }

    log::debug!("Assigned {} channel labels: {:?}", labels.len(), labels);
    signal.with_channels(labels)
}

/// Keep only the selected channels that still exist after a reassignment.
pub fn retain_selection(selection: &[String], channels: &[String]) -> Vec<String> {
    selection
        .iter()
        .filter(|s| channels.contains(s))
        .cloned()
        .collect()
}
