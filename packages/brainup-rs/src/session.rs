//! Per-user analysis state.
//!
//! A [`Session`] owns the current recording, an optional filtered view of it
//! and the cached band powers. Every operation either succeeds and replaces
//! state wholesale or fails and leaves the session as it was.

use crate::channels::{assign_layout, ChannelAssignment};
use crate::config::AnalysisConfig;
use crate::error::{BrainupError, Result};
use crate::export::export_power_bands;
use crate::file_readers::{decode_named, SignalFormat};
use crate::montage::{attach_positions_with, project_topography, TopographyOptions};
use crate::signal_processing::{compute_psd, extract_canonical_bands, filter_with_order, FilterPreset};
use crate::storage::{ArtifactClass, Payload, SessionStore, Upload};
use crate::types::{FrequencyBand, PowerBands, RawTrace, SignalMatrix};
use std::path::{Path, PathBuf};

pub const EXPORT_FILE_NAME: &str = "power_bands.csv";
pub const TOPOMAP_FILE_NAME: &str = "topomap.png";

type Cutoffs = (Option<f64>, Option<f64>);

#[derive(Debug)]
pub struct Session {
    id: String,
    dir: PathBuf,
    analysis: AnalysisConfig,
    source: Option<SignalMatrix>,
    active: Option<SignalMatrix>,
    filter: Option<Cutoffs>,
    power_bands: Option<PowerBands>,
    upload_name: Option<String>,
}

impl Session {
    pub fn open(store: &SessionStore, existing_id: Option<&str>) -> Result<Self> {
        Self::open_with(store, existing_id, AnalysisConfig::default())
    }

    pub fn open_with(store: &SessionStore, existing_id: Option<&str>, analysis: AnalysisConfig) -> Result<Self> {
        let (dir, id) = store.create_session(existing_id)?;
        Ok(Self {
            id,
            dir,
            analysis,
            source: None,
            active: None,
            filter: None,
            power_bands: None,
            upload_name: None,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The active signal (filtered when a filter is applied).
    pub fn signal(&self) -> Option<&SignalMatrix> {
        self.active.as_ref()
    }

    /// The unfiltered signal.
    pub fn source(&self) -> Option<&SignalMatrix> {
        self.source.as_ref()
    }

    pub fn channels(&self) -> Vec<String> {
        self.active
            .as_ref()
            .map(|s| s.channels().to_vec())
            .unwrap_or_default()
    }

    pub fn filter(&self) -> Option<Cutoffs> {
        self.filter
    }

    /// Stored name of the last accepted upload.
    pub fn upload_name(&self) -> Option<&str> {
        self.upload_name.as_deref()
    }

    fn require_source(&self) -> Result<&SignalMatrix> {
        self.source
            .as_ref()
            .ok_or_else(|| BrainupError::InvalidSignal("no recording loaded".to_string()))
    }

    fn require_active(&self) -> Result<&SignalMatrix> {
        self.active
            .as_ref()
            .ok_or_else(|| BrainupError::InvalidSignal("no recording loaded".to_string()))
    }

    /// Store the upload under a fresh name, decode it and make it current.
    /// Returns the new channel list.
    pub fn ingest(&mut self, store: &SessionStore, upload: Upload) -> Result<Vec<String>> {
        let format = SignalFormat::from_file_name(&upload.file_name)?;
        let extension = upload.extension().unwrap_or_default();
        let stored_name = format!("{}.{}", uuid::Uuid::new_v4(), extension);
        let Upload { file_name, payload } = upload;

        let bytes = payload.into_bytes()?;
        store.persist(
            Payload::Bytes(bytes.clone()),
            &stored_name,
            Some(&self.id),
            ArtifactClass::Upload,
        )?;

        let signal = decode_named(&bytes, format, &file_name, &self.analysis.decode_options())?;
        let channels = signal.channels().to_vec();

        log::info!(
            "Session {} loaded {} as {} ({} channels, {:.1} s)",
            self.id,
            file_name,
            stored_name,
            signal.num_channels(),
            signal.duration()
        );

        self.active = Some(signal.clone());
        self.source = Some(signal);
        self.filter = None;
        self.power_bands = None;
        self.upload_name = Some(stored_name);
        Ok(channels)
    }

    /// Relabel channels. Drops any filter and cached bands.
    pub fn assign_layout(&mut self, assignment: &ChannelAssignment) -> Result<Vec<String>> {
        let relabelled = assign_layout(self.require_source()?, assignment)?;
        let channels = relabelled.channels().to_vec();

        self.active = Some(relabelled.clone());
        self.source = Some(relabelled);
        self.filter = None;
        self.power_bands = None;
        Ok(channels)
    }

    /// Filter the unfiltered source. `(None, None)` clears the filter.
    pub fn apply_filter(&mut self, low: Option<f64>, high: Option<f64>) -> Result<()> {
        let filtered = filter_with_order(self.require_source()?, low, high, self.analysis.filter_order)?;

        self.active = Some(filtered);
        self.filter = match (low, high) {
            (None, None) => None,
            cutoffs => Some(cutoffs),
        };
        self.power_bands = None;
        Ok(())
    }

    pub fn apply_preset(&mut self, preset: &FilterPreset) -> Result<()> {
        let (low, high) = preset.cutoffs();
        self.apply_filter(low, high)
    }

    /// Welch PSD and the canonical bands of the active signal, cached until
    /// the signal changes.
    pub fn compute_power_bands(&mut self) -> Result<&PowerBands> {
        if self.power_bands.is_none() {
            let spectrum = compute_psd(self.require_active()?)?;
            self.power_bands = Some(extract_canonical_bands(&spectrum));
        }
        self.power_bands
            .as_ref()
            .ok_or_else(|| BrainupError::InvalidSignal("band powers unavailable".to_string()))
    }

    /// Last computed band powers, if still valid.
    pub fn power_bands(&self) -> Option<&PowerBands> {
        self.power_bands.as_ref()
    }

    pub fn raw_channels(&self, names: &[String]) -> Result<RawTrace> {
        let selected = self.require_active()?.select(names)?;
        Ok(RawTrace {
            times: selected.times(),
            channels: selected.channels().to_vec(),
            data: selected.data().to_vec(),
        })
    }

    /// Persist the band-power CSV as a derived artifact.
    pub fn export(&mut self, store: &SessionStore) -> Result<PathBuf> {
        let csv = export_power_bands(self.compute_power_bands()?)?;
        store.persist(
            Payload::Bytes(csv.into_bytes()),
            EXPORT_FILE_NAME,
            Some(&self.id),
            ArtifactClass::Derived,
        )
    }

    /// Render the canonical-band topography and persist the PNG.
    pub fn render_topography(
        &self,
        store: &SessionStore,
        template: &str,
        options: &TopographyOptions,
    ) -> Result<PathBuf> {
        let signal = self.require_active()?;
        let montage = attach_positions_with(signal.channels(), template)?;
        let image = project_topography(signal, &montage, &FrequencyBand::canonical(), options)?;
        store.persist(
            Payload::Image(image),
            TOPOMAP_FILE_NAME,
            Some(&self.id),
            ArtifactClass::Derived,
        )
    }

    /// Drop all state and remove the session from the store.
    pub fn teardown(self, store: &SessionStore) -> Result<()> {
        store.teardown_session(&self.id)
    }
}
