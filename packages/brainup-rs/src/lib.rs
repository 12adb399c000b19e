//! EEG recordings in, band powers and scalp maps out.
//!
//! Uploads are decoded from CSV, Excel, EDF or XDF into a [`SignalMatrix`],
//! analysed with Welch's method into canonical frequency bands, and projected
//! onto a 10-20 montage. Everything a user produces lives in a
//! [`SessionStore`] that expires it on a schedule.

pub mod channels;
pub mod config;
pub mod error;
pub mod export;
pub mod file_readers;
pub mod montage;
pub mod session;
pub mod signal_processing;
pub mod storage;
pub mod types;

pub use types::*;
pub use channels::{assign_layout, available_layouts, layout, ChannelAssignment, ChannelLayout};
pub use config::{AnalysisConfig, BrainupConfig, ConfigError, StoreConfig};
pub use error::{BrainupError, Result};
pub use export::{export_power_bands, parse_export, write_power_bands, ExportTable};
pub use file_readers::{decode, decode_file, DecodeOptions, SignalFormat};
pub use montage::{attach_positions, attach_positions_with, project_topography, Montage, Topography, TopographyOptions};
pub use session::Session;
pub use signal_processing::{compute_psd, extract_bands, extract_canonical_bands, FilterPreset};
pub use storage::{ArtifactClass, Payload, SessionStore, SweepReport, Sweeper, SweeperHandle, Upload};
