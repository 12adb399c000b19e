//! Standard 10-20 / 10-10 electrode positions on a unit sphere.
//!
//! Positions use spherical (theta, phi) in degrees: theta is the angle from
//! the vertex (negative on the left hemisphere), phi the azimuth from the
//! right ear towards the nose. The 2-D projection is azimuthal equidistant,
//! so the 10-20 equator (theta = 92) sits just outside the unit head circle.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElectrodePosition {
    pub label: String,
    /// Cartesian head coordinates (x right, y nose, z up), unit radius.
    pub position: [f64; 3],
    /// Top-down projection used for topography, head circle radius ~1.
    pub projected: [f64; 2],
}

impl ElectrodePosition {
    pub fn from_spherical(label: impl Into<String>, theta_deg: f64, phi_deg: f64) -> Self {
        let theta = theta_deg.to_radians();
        let phi = phi_deg.to_radians();
        let r = theta_deg / 90.0;

        Self {
            label: label.into(),
            position: [theta.sin() * phi.cos(), theta.sin() * phi.sin(), theta.cos()],
            projected: [r * phi.cos(), r * phi.sin()],
        }
    }
}

/// Legacy 10-20 names and their 10-10 equivalents.
const ALIASES: &[(&str, &str)] = &[("T3", "T7"), ("T4", "T8"), ("T5", "P7"), ("T6", "P8")];

/// Fiducials of the standard template: nasion, left and right preauricular.
pub const FIDUCIALS: &[(&str, f64, f64)] = &[("Nasion", 115.0, 90.0), ("LPA", -115.0, 0.0), ("RPA", 115.0, 0.0)];

/// `standard_1020` template in template order.
pub const STANDARD_1020: &[(&str, f64, f64)] = &[
    ("Fp1", -92.0, -72.0),
    ("Fpz", 92.0, 90.0),
    ("Fp2", 92.0, 72.0),
    ("AF7", -92.0, -54.0),
    ("AF3", -74.0, -65.0),
    ("AFz", 69.0, 90.0),
    ("AF4", 74.0, 65.0),
    ("AF8", 92.0, 54.0),
    ("F9", -115.0, -36.0),
    ("F7", -92.0, -36.0),
    ("F5", -75.0, -41.0),
    ("F3", -60.0, -51.0),
    ("F1", -50.0, -68.0),
    ("Fz", 46.0, 90.0),
    ("F2", 50.0, 68.0),
    ("F4", 60.0, 51.0),
    ("F6", 75.0, 41.0),
    ("F8", 92.0, 36.0),
    ("F10", 115.0, 36.0),
    ("FT9", -115.0, -18.0),
    ("FT7", -92.0, -18.0),
    ("FC5", -72.0, -21.0),
    ("FC3", -51.0, -33.0),
    ("FC1", -32.0, -45.0),
    ("FCz", 23.0, 90.0),
    ("FC2", 32.0, 45.0),
    ("FC4", 51.0, 33.0),
    ("FC6", 72.0, 21.0),
    ("FT8", 92.0, 18.0),
    ("FT10", 115.0, 18.0),
    ("A1", -125.0, 0.0),
    ("T9", -115.0, 0.0),
    ("T7", -92.0, 0.0),
    ("C5", -69.0, 0.0),
    ("C3", -46.0, 0.0),
    ("C1", -23.0, 0.0),
    ("Cz", 0.0, 0.0),
    ("C2", 23.0, 0.0),
    ("C4", 46.0, 0.0),
    ("C6", 69.0, 0.0),
    ("T8", 92.0, 0.0),
    ("T10", 115.0, 0.0),
    ("A2", 125.0, 0.0),
    ("TP9", -115.0, 18.0),
    ("TP7", -92.0, 18.0),
    ("CP5", -72.0, 21.0),
    ("CP3", -51.0, 33.0),
    ("CP1", -32.0, 45.0),
    ("CPz", 23.0, -90.0),
    ("CP2", 32.0, -45.0),
    ("CP4", 51.0, -33.0),
    ("CP6", 72.0, -21.0),
    ("TP8", 92.0, -18.0),
    ("TP10", 115.0, -18.0),
    ("P9", -115.0, 36.0),
    ("P7", -92.0, 36.0),
    ("P5", -75.0, 41.0),
    ("P3", -60.0, 51.0),
    ("P1", -50.0, 68.0),
    ("Pz", 46.0, -90.0),
    ("P2", 50.0, -68.0),
    ("P4", 60.0, -51.0),
    ("P6", 75.0, -41.0),
    ("P8", 92.0, -36.0),
    ("P10", 115.0, -36.0),
    ("PO7", -92.0, 54.0),
    ("PO3", -74.0, 65.0),
    ("POz", 69.0, -90.0),
    ("PO4", 74.0, -65.0),
    ("PO8", 92.0, -54.0),
    ("O1", -92.0, 72.0),
    ("Oz", 92.0, -90.0),
    ("O2", 92.0, -72.0),
    ("Iz", 115.0, -90.0),
];

/// Template label for `label`, resolving case and legacy aliases.
pub fn canonical_label(label: &str) -> Option<&'static str> {
    let label = label.trim();
    let resolved = ALIASES
        .iter()
        .find(|(old, _)| old.eq_ignore_ascii_case(label))
        .map(|(_, new)| *new)
        .unwrap_or(label);

    STANDARD_1020
        .iter()
        .find(|(name, _, _)| name.eq_ignore_ascii_case(resolved))
        .map(|(name, _, _)| *name)
}

/// Position of `label`, keeping the caller's spelling of the label.
pub fn electrode_position(label: &str) -> Option<ElectrodePosition> {
    let canonical = canonical_label(label)?;
    STANDARD_1020
        .iter()
        .find(|(name, _, _)| *name == canonical)
        .map(|&(_, theta, phi)| ElectrodePosition::from_spherical(label, theta, phi))
}

pub fn fiducials() -> Vec<ElectrodePosition> {
    FIDUCIALS
        .iter()
        .map(|&(name, theta, phi)| ElectrodePosition::from_spherical(name, theta, phi))
        .collect()
}
