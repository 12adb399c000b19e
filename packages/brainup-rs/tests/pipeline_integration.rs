use brainup_rs::{
    band_by_name, compute_psd, extract_bands, extract_canonical_bands, parse_export, BrainupError,
    ChannelAssignment, FrequencyBand, Session, SessionStore, StoreConfig, TopographyOptions, Upload,
};
use std::f64::consts::PI;

/// Tabular recording: one column per channel, each a sine with its own
/// frequency and amplitude.
fn table(headers: &[&str], seconds: usize, rate: usize) -> String {
    let mut text = headers.join(",");
    text.push('\n');
    for i in 0..seconds * rate {
        let t = i as f64 / rate as f64;
        let row: Vec<String> = (0..headers.len())
            .map(|c| {
                let freq = 6.0 + 3.0 * c as f64;
                let amp = 10.0 + c as f64;
                format!("{:.6}", amp * (2.0 * PI * freq * t).sin())
            })
            .collect();
        text.push_str(&row.join(","));
        text.push('\n');
    }
    text
}

fn open_store() -> (tempfile::TempDir, SessionStore) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SessionStore::open(StoreConfig::in_dir(dir.path())).expect("open store");
    (dir, store)
}

/// Write one XDF chunk: 4-byte length width, length, tag, content.
fn xdf_chunk(out: &mut Vec<u8>, tag: u16, content: &[u8]) {
    out.push(4);
    out.extend_from_slice(&((content.len() + 2) as u32).to_le_bytes());
    out.extend_from_slice(&tag.to_le_bytes());
    out.extend_from_slice(content);
}

#[test]
fn test_alphabetic_headers_name_channels() {
    let (_dir, store) = open_store();
    let mut session = Session::open(&store, None).unwrap();

    let channels = session
        .ingest(&store, Upload::from_bytes(table(&["A", "B", "C"], 2, 256).into_bytes(), "rec.csv"))
        .unwrap();

    assert_eq!(channels, vec!["A", "B", "C"]);
    let signal = session.signal().unwrap();
    assert_eq!(signal.num_samples(), 512);
    assert_eq!(signal.sample_rate(), 256.0);
}

#[test]
fn test_numeric_headers_become_data() {
    let (_dir, store) = open_store();
    let mut session = Session::open(&store, None).unwrap();

    let mut text = table(&["x", "y", "z"], 2, 256);
    let header_end = text.find('\n').unwrap();
    text.replace_range(..header_end, "0,1,2");
    let channels = session
        .ingest(&store, Upload::from_bytes(text.into_bytes(), "rec.csv"))
        .unwrap();

    assert_eq!(channels, vec!["0", "1", "2"]);
    let signal = session.signal().unwrap();
    assert_eq!(signal.num_samples(), 513);
    assert_eq!(signal.data()[2][0], 2.0);
}

#[test]
fn test_data_uri_upload() {
    use base64::Engine;
    let (_dir, store) = open_store();
    let mut session = Session::open(&store, None).unwrap();

    let encoded = base64::engine::general_purpose::STANDARD.encode(table(&["Fz", "Cz"], 1, 256));
    let upload = Upload::from_data_uri(format!("data:text/csv;base64,{}", encoded), "upload.CSV");
    assert_eq!(session.ingest(&store, upload).unwrap(), vec!["Fz", "Cz"]);
}

#[test]
fn test_band_lookup_ignores_case() {
    for name in ["gamma", "Gamma", "GAMMA"] {
        let band = band_by_name(name).unwrap();
        assert_eq!((band.low, band.high), (30.0, 100.0));
        assert!(band.contains(100.0));
    }
    assert!(matches!(band_by_name("mu"), Err(BrainupError::UnknownBand(_))));
}

#[test]
fn test_band_extraction_is_a_pure_window() {
    let (_dir, store) = open_store();
    let mut session = Session::open(&store, None).unwrap();
    session
        .ingest(&store, Upload::from_bytes(table(&["A", "B"], 8, 256).into_bytes(), "rec.csv"))
        .unwrap();

    let spectrum = compute_psd(session.signal().unwrap()).unwrap();
    let alpha = FrequencyBand::alpha();
    let bands = extract_bands(&spectrum, std::slice::from_ref(&alpha));
    let band = &bands.bands[0];

    let expected: Vec<usize> = spectrum
        .frequencies
        .iter()
        .enumerate()
        .filter(|(_, f)| **f >= 8.0 && **f < 13.0)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(band.frequencies.len(), expected.len());
    for (k, &i) in expected.iter().enumerate() {
        assert_eq!(band.frequencies[k], spectrum.frequencies[i]);
        assert_eq!(band.power[1][k], spectrum.power[1][i]);
    }

    assert_eq!(extract_canonical_bands(&spectrum), extract_canonical_bands(&spectrum));
}

#[test]
fn test_no_filter_leaves_signal_unchanged() {
    let (_dir, store) = open_store();
    let mut session = Session::open(&store, None).unwrap();
    session
        .ingest(&store, Upload::from_bytes(table(&["A", "B"], 2, 256).into_bytes(), "rec.csv"))
        .unwrap();

    let before = session.signal().unwrap().clone();
    session.apply_filter(None, None).unwrap();
    assert_eq!(session.signal().unwrap(), &before);
}

#[test]
fn test_layout_switch_returns_full_channel_list() {
    let (_dir, store) = open_store();
    let mut session = Session::open(&store, None).unwrap();
    session
        .ingest(
            &store,
            Upload::from_bytes(table(&["1", "2", "3", "4"], 1, 256).into_bytes(), "rec.csv"),
        )
        .unwrap();

    let first = session
        .assign_layout(&ChannelAssignment::Automatic {
            layout: "10-20-21".into(),
        })
        .unwrap();
    assert_eq!(first.len(), 4);

    let second = session
        .assign_layout(&ChannelAssignment::Automatic {
            layout: "10-10-68".into(),
        })
        .unwrap();
    assert_eq!(second, &brainup_rs::layout("10-10-68").unwrap().labels[..4]);

    let stale: Vec<String> = first.iter().filter(|c| !second.contains(c)).cloned().collect();
    let kept = brainup_rs::channels::retain_selection(&first, &second);
    assert_eq!(kept.len() + stale.len(), first.len());
}

#[test]
fn test_export_round_trip() {
    let (_dir, store) = open_store();
    let mut session = Session::open(&store, None).unwrap();
    session
        .ingest(&store, Upload::from_bytes(table(&["Fz", "Cz"], 8, 256).into_bytes(), "rec.csv"))
        .unwrap();

    let path = session.export(&store).unwrap();
    let bands = session.power_bands().unwrap().clone();
    let table = parse_export(&std::fs::read_to_string(&path).unwrap()).unwrap();

    for band in &bands.bands {
        let name = &band.band.name;
        assert_eq!(table.column(&format!("{}_freq", name)).unwrap(), band.frequencies.as_slice());
        for (idx, channel) in bands.channels.iter().enumerate() {
            let column = table.column(&format!("{}({})_power", channel, name)).unwrap();
            assert_eq!(column, band.power[idx].as_slice());
        }
    }
    assert!(store.expiry("power_bands.csv", Some(session.id())).is_some());
}

#[test]
fn test_topography_png() {
    let (_dir, store) = open_store();
    let mut session = Session::open(&store, None).unwrap();
    session
        .ingest(
            &store,
            Upload::from_bytes(table(&["Fz", "Cz", "Pz", "C3", "C4"], 4, 256).into_bytes(), "rec.csv"),
        )
        .unwrap();

    let path = session
        .render_topography(&store, "standard_1020", &TopographyOptions { resolution: 32 })
        .unwrap();
    let png = std::fs::read(path).unwrap();
    assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
}

#[test]
fn test_too_few_known_electrodes() {
    let (_dir, store) = open_store();
    let mut session = Session::open(&store, None).unwrap();
    session
        .ingest(&store, Upload::from_bytes(table(&["Fz", "Cz", "Aux"], 2, 256).into_bytes(), "rec.csv"))
        .unwrap();

    let err = session
        .render_topography(&store, "standard_1020", &TopographyOptions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        BrainupError::InsufficientElectrodes { found: 2, required: 3 }
    ));
}

#[test]
fn test_xdf_without_eeg_stream() {
    let (_dir, store) = open_store();
    let mut session = Session::open(&store, None).unwrap();

    let mut bytes = b"XDF:".to_vec();
    xdf_chunk(&mut bytes, 1, b"<?xml version=\"1.0\"?><info><version>1.0</version></info>");
    let header = b"<?xml version=\"1.0\"?><info><name>Markers</name><type>Markers</type>\
<channel_count>1</channel_count><nominal_srate>0</nominal_srate>\
<channel_format>string</channel_format></info>";
    let mut content = 1u32.to_le_bytes().to_vec();
    content.extend_from_slice(header);
    xdf_chunk(&mut bytes, 2, &content);

    let err = session
        .ingest(&store, Upload::from_bytes(bytes, "markers.xdf"))
        .unwrap_err();
    assert!(matches!(err, BrainupError::NoEegStreamFound));
    assert!(session.signal().is_none());
}

#[test]
fn test_unsupported_extension() {
    let (_dir, store) = open_store();
    let mut session = Session::open(&store, None).unwrap();
    let err = session
        .ingest(&store, Upload::from_bytes(b"1,2".to_vec(), "rec.txt"))
        .unwrap_err();
    assert!(matches!(err, BrainupError::UnsupportedFormat(_)));
    assert!(store.records().is_empty());
}
