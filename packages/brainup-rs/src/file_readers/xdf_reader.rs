use super::{FileReaderError, FileResult, FormatReader};
use crate::types::SignalMatrix;
use byteorder::{LittleEndian, ReadBytesExt};
use quick_xml::events::Event;
use quick_xml::Reader as XmlReader;
use std::collections::HashMap;
use std::io::{Cursor, Read};

/// XDF (Extensible Data Format) Reader
///
/// XDF is the Lab Streaming Layer container: a sequence of tagged chunks,
/// with one XML header per stream and binary sample chunks. Only the first
/// EEG stream is decoded; other streams (markers, motion, ...) are skipped.
pub struct XdfFileReader;

// XDF chunk tags
const CHUNK_FILE_HEADER: u16 = 1;
const CHUNK_STREAM_HEADER: u16 = 2;
const CHUNK_SAMPLES: u16 = 3;
const CHUNK_CLOCK_OFFSET: u16 = 4;
const CHUNK_BOUNDARY: u16 = 5;
const CHUNK_STREAM_FOOTER: u16 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChannelFormat {
    Float32,
    Double64,
    Int8,
    Int16,
    Int32,
    Int64,
    String,
}

impl ChannelFormat {
    fn parse(value: &str) -> FileResult<Self> {
        match value.trim() {
            "float32" => Ok(ChannelFormat::Float32),
            "double64" => Ok(ChannelFormat::Double64),
            "int8" => Ok(ChannelFormat::Int8),
            "int16" => Ok(ChannelFormat::Int16),
            "int32" => Ok(ChannelFormat::Int32),
            "int64" => Ok(ChannelFormat::Int64),
            "string" => Ok(ChannelFormat::String),
            other => Err(FileReaderError::Parse(format!("unknown channel format '{}'", other))),
        }
    }

    /// Bytes per value; `None` for variable-length strings.
    fn width(&self) -> Option<u64> {
        match self {
            ChannelFormat::Int8 => Some(1),
            ChannelFormat::Int16 => Some(2),
            ChannelFormat::Float32 | ChannelFormat::Int32 => Some(4),
            ChannelFormat::Double64 | ChannelFormat::Int64 => Some(8),
            ChannelFormat::String => None,
        }
    }

    fn read_value<R: Read>(&self, reader: &mut R) -> FileResult<f64> {
        let value = match self {
            ChannelFormat::Float32 => reader.read_f32::<LittleEndian>()? as f64,
            ChannelFormat::Double64 => reader.read_f64::<LittleEndian>()?,
            ChannelFormat::Int8 => reader.read_i8()? as f64,
            ChannelFormat::Int16 => reader.read_i16::<LittleEndian>()? as f64,
            ChannelFormat::Int32 => reader.read_i32::<LittleEndian>()? as f64,
            ChannelFormat::Int64 => reader.read_i64::<LittleEndian>()? as f64,
            ChannelFormat::String => {
                return Err(FileReaderError::InvalidData(
                    "string-valued streams hold no signal".to_string(),
                ))
            }
        };
        Ok(value)
    }
}

/// Fields of a `<info>` stream header.
#[derive(Debug, Clone, Default)]
struct StreamInfo {
    name: String,
    stream_type: String,
    channel_count: usize,
    nominal_srate: f64,
    channel_format: String,
    channel_labels: Vec<String>,
}

impl StreamInfo {
    fn labels(&self) -> Vec<String> {
        if self.channel_labels.len() == self.channel_count {
            self.channel_labels
                .iter()
                .enumerate()
                .map(|(i, l)| if l.is_empty() { format!("CH{}", i + 1) } else { l.clone() })
                .collect()
        } else {
            if !self.channel_labels.is_empty() {
                log::warn!(
                    "Stream '{}' describes {} labels for {} channels, using defaults",
                    self.name,
                    self.channel_labels.len(),
                    self.channel_count
                );
            }
            (0..self.channel_count).map(|i| format!("CH{}", i + 1)).collect()
        }
    }
}

fn read_varlen<R: Read>(reader: &mut R) -> FileResult<u64> {
    match reader.read_u8()? {
        1 => Ok(reader.read_u8()? as u64),
        4 => Ok(reader.read_u32::<LittleEndian>()? as u64),
        8 => Ok(reader.read_u64::<LittleEndian>()?),
        other => Err(FileReaderError::Parse(format!("invalid length width {}", other))),
    }
}

fn parse_stream_header(xml: &[u8]) -> FileResult<StreamInfo> {
    let xml = String::from_utf8_lossy(xml);
    let mut reader = XmlReader::from_str(&xml);
    reader.config_mut().trim_text(true);

    let mut info = StreamInfo::default();
    let mut path: Vec<String> = Vec::new();
    let mut label: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "channel" && path_is(&path, &["info", "desc", "channels"]) {
                    label = Some(String::new());
                }
                path.push(name);
            }
            Ok(Event::End(_)) => {
                if let Some(closed) = path.pop() {
                    if closed == "channel" && path_is(&path, &["info", "desc", "channels"]) {
                        info.channel_labels.push(label.take().unwrap_or_default());
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                if e.name().as_ref() == b"channel" && path_is(&path, &["info", "desc", "channels"]) {
                    info.channel_labels.push(String::new());
                }
            }
            Ok(Event::Text(e)) => {
                let text = String::from_utf8_lossy(&e).trim().to_string();
                if path_is(&path, &["info", "name"]) {
                    info.name = text;
                } else if path_is(&path, &["info", "type"]) {
                    info.stream_type = text;
                } else if path_is(&path, &["info", "channel_count"]) {
                    info.channel_count = text.parse().map_err(|_| {
                        FileReaderError::Parse(format!("invalid channel_count '{}'", text))
                    })?;
                } else if path_is(&path, &["info", "nominal_srate"]) {
                    info.nominal_srate = text.parse().map_err(|_| {
                        FileReaderError::Parse(format!("invalid nominal_srate '{}'", text))
                    })?;
                } else if path_is(&path, &["info", "channel_format"]) {
                    info.channel_format = text;
                } else if path_is(&path, &["info", "desc", "channels", "channel", "label"]) {
                    if let Some(l) = label.as_mut() {
                        l.push_str(&text);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(FileReaderError::Xml(e.to_string())),
            _ => {}
        }
    }

    Ok(info)
}

fn path_is(path: &[String], expected: &[&str]) -> bool {
    path.len() == expected.len() && path.iter().zip(expected).all(|(a, b)| a == b)
}

/// Append the samples of one chunk to `data` (channel-major).
fn decode_samples(content: &[u8], format: ChannelFormat, data: &mut [Vec<f64>]) -> FileResult<()> {
    let mut reader = Cursor::new(content);
    let count = read_varlen(&mut reader)?;

    // Each sample carries at least its timestamp flag plus one value per channel.
    let min_sample = 1 + format.width().unwrap_or(1) * data.len() as u64;
    let remaining = content.len() as u64 - reader.position();
    if count > remaining / min_sample {
        return Err(FileReaderError::Parse(format!(
            "sample chunk claims {} samples but holds {} bytes",
            count, remaining
        )));
    }
    for channel in data.iter_mut() {
        channel.reserve(count as usize);
    }

    for _ in 0..count {
        match reader.read_u8()? {
            0 => {}
            8 => {
                reader.read_f64::<LittleEndian>()?;
            }
            other => {
                return Err(FileReaderError::Parse(format!("invalid timestamp width {}", other)))
            }
        }
        for channel in data.iter_mut() {
            channel.push(format.read_value(&mut reader)?);
        }
    }
    Ok(())
}

impl XdfFileReader {
    fn read_chunks(bytes: &[u8]) -> FileResult<(Vec<(u32, StreamInfo)>, HashMap<u32, Vec<Vec<u8>>>)> {
        let mut reader = Cursor::new(bytes);
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != b"XDF:" {
            return Err(FileReaderError::Parse("missing XDF magic".to_string()));
        }

        let mut streams: Vec<(u32, StreamInfo)> = Vec::new();
        let mut sample_chunks: HashMap<u32, Vec<Vec<u8>>> = HashMap::new();

        while (reader.position() as usize) < bytes.len() {
            let chunk_len = read_varlen(&mut reader)?;
            if chunk_len < 2 {
                return Err(FileReaderError::Parse(format!("chunk length {} too short", chunk_len)));
            }
            let remaining = bytes.len() as u64 - reader.position();
            if chunk_len > remaining {
                return Err(FileReaderError::Parse(format!(
                    "chunk length {} exceeds the {} bytes left",
                    chunk_len, remaining
                )));
            }
            let tag = reader.read_u16::<LittleEndian>()?;
            let mut content = vec![0u8; (chunk_len - 2) as usize];
            reader.read_exact(&mut content)?;

            match tag {
                CHUNK_FILE_HEADER => {
                    log::debug!("XDF file header: {}", String::from_utf8_lossy(&content));
                }
                CHUNK_STREAM_HEADER | CHUNK_SAMPLES if content.len() < 4 => {
                    return Err(FileReaderError::Parse("chunk missing stream id".to_string()));
                }
                CHUNK_STREAM_HEADER => {
                    let id = u32::from_le_bytes([content[0], content[1], content[2], content[3]]);
                    let info = parse_stream_header(&content[4..])?;
                    log::info!("Found XDF stream '{}' (id {}, type '{}')", info.name, id, info.stream_type);
                    streams.push((id, info));
                }
                CHUNK_SAMPLES => {
                    let id = u32::from_le_bytes([content[0], content[1], content[2], content[3]]);
                    sample_chunks.entry(id).or_default().push(content[4..].to_vec());
                }
                CHUNK_CLOCK_OFFSET | CHUNK_BOUNDARY | CHUNK_STREAM_FOOTER => {}
                other => log::warn!("Skipping unknown XDF chunk tag {}", other),
            }
        }

        Ok((streams, sample_chunks))
    }
}

impl FormatReader for XdfFileReader {
    fn read(&self, bytes: &[u8]) -> FileResult<SignalMatrix> {
        let (streams, mut sample_chunks) = Self::read_chunks(bytes)?;

        let (id, info) = streams
            .into_iter()
            .find(|(_, info)| info.stream_type.eq_ignore_ascii_case("eeg"))
            .ok_or(FileReaderError::NoEegStream)?;

        let format = ChannelFormat::parse(&info.channel_format)?;
        if !(info.nominal_srate > 0.0) {
            return Err(FileReaderError::InvalidData(format!(
                "stream '{}' has no regular sample rate",
                info.name
            )));
        }

        let mut data: Vec<Vec<f64>> = vec![Vec::new(); info.channel_count];
        for chunk in sample_chunks.remove(&id).unwrap_or_default() {
            decode_samples(&chunk, format, &mut data)?;
        }

        log::debug!(
            "XDF stream '{}': {} channels, {} samples @ {} Hz",
            info.name,
            info.channel_count,
            data.first().map(Vec::len).unwrap_or(0),
            info.nominal_srate
        );

        SignalMatrix::new(info.labels(), info.nominal_srate, data)
            .map_err(|e| FileReaderError::InvalidData(e.to_string()))
    }

    fn format_name(&self) -> &str {
        "XDF"
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::XdfBuilder;
    use super::*;

    #[test]
    fn test_reads_eeg_stream() {
        let bytes = XdfBuilder::new()
            .stream(1, "Markers", 0.0, &[], 1)
            .stream(2, "EEG", 500.0, &["Fp1", "Fp2"], 2)
            .samples(2, &[vec![1.0, 2.0], vec![3.0, 4.0]])
            .samples(2, &[vec![5.0, 6.0]])
            .build();

        let sig = XdfFileReader.read(&bytes).unwrap();
        assert_eq!(sig.channels(), &["Fp1".to_string(), "Fp2".to_string()]);
        assert_eq!(sig.sample_rate(), 500.0);
        assert_eq!(sig.data()[0], vec![1.0, 3.0, 5.0]);
        assert_eq!(sig.data()[1], vec![2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_stream_type_is_case_insensitive() {
        let bytes = XdfBuilder::new()
            .stream(7, "eeg", 250.0, &["Cz"], 1)
            .samples(7, &[vec![1.5]])
            .build();
        assert_eq!(XdfFileReader.read(&bytes).unwrap().num_samples(), 1);
    }

    #[test]
    fn test_label_count_mismatch_synthesizes_labels() {
        let bytes = XdfBuilder::new()
            .stream(1, "EEG", 100.0, &["Cz"], 3)
            .samples(1, &[vec![0.0, 0.0, 0.0]])
            .build();
        let sig = XdfFileReader.read(&bytes).unwrap();
        assert_eq!(sig.channels(), &["CH1".to_string(), "CH2".to_string(), "CH3".to_string()]);
    }

    #[test]
    fn test_no_eeg_stream() {
        let bytes = XdfBuilder::new().stream(1, "Markers", 0.0, &[], 1).build();
        assert!(matches!(XdfFileReader.read(&bytes), Err(FileReaderError::NoEegStream)));
    }

    #[test]
    fn test_bad_magic() {
        assert!(matches!(XdfFileReader.read(b"XDG:...."), Err(FileReaderError::Parse(_))));
    }

    #[test]
    fn test_oversized_chunk_length_is_parse_error() {
        let mut bytes = b"XDF:".to_vec();
        bytes.push(8);
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());
        bytes.extend_from_slice(&[2, 0]);
        assert!(matches!(XdfFileReader.read(&bytes), Err(FileReaderError::Parse(_))));

        let mut bytes = b"XDF:".to_vec();
        bytes.push(8);
        bytes.extend_from_slice(&(1u64 << 40).to_le_bytes());
        bytes.extend_from_slice(&[3, 0, 1, 0, 0, 0]);
        assert!(matches!(XdfFileReader.read(&bytes), Err(FileReaderError::Parse(_))));
    }

    #[test]
    fn test_sample_count_beyond_chunk_is_parse_error() {
        let mut bytes = XdfBuilder::new().stream(1, "EEG", 100.0, &["Cz"], 1).build();
        let mut content = 1u32.to_le_bytes().to_vec();
        content.push(8);
        content.extend_from_slice(&u64::MAX.to_le_bytes());
        content.extend_from_slice(&[0, 0, 0, 0, 0]);
        bytes.push(4);
        bytes.extend_from_slice(&((content.len() + 2) as u32).to_le_bytes());
        bytes.extend_from_slice(&3u16.to_le_bytes());
        bytes.extend_from_slice(&content);
        assert!(matches!(XdfFileReader.read(&bytes), Err(FileReaderError::Parse(_))));
    }
}
