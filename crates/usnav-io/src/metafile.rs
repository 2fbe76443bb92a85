use std::{
    collections::{BTreeSet, HashMap},
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use crate::error::SequenceError;

/// Header record after which the binary pixel payload starts.
pub const ELEMENT_DATA_FILE_LOCAL: &str = "ElementDataFile = LOCAL";

const DIM_SIZE_KEY: &str = "DimSize =";
const FRAME_PREFIX: &str = "Seq_Frame";
const TRANSFORM_TOKEN: &str = "Transform";
const FLAT_TRANSFORM_LEN: usize = 12;

/// Image size and number of frames declared by the `DimSize` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceDimensions {
    /// Image width in pixels (columns).
    pub width: usize,
    /// Image height in pixels (rows).
    pub height: usize,
    /// Number of frames in the pixel payload.
    pub frame_count: usize,
}

/// The tracked transforms that contribute a per-frame pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackedTransform {
    /// `ProbeToTrackerTransform`
    ProbeToTracker,
    /// `UltrasoundToTrackerTransform`
    UltrasoundToTracker,
}

impl TrackedTransform {
    const ALL: [TrackedTransform; 2] = [Self::ProbeToTracker, Self::UltrasoundToTracker];

    /// The header key suffix of the transform record.
    pub fn key(&self) -> &'static str {
        match self {
            Self::ProbeToTracker => "ProbeToTrackerTransform",
            Self::UltrasoundToTracker => "UltrasoundToTrackerTransform",
        }
    }

    fn find_value_record(line: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| line.contains(&format!("{} =", t.key())))
    }

    fn find_status_record(line: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| line.contains(&format!("{}Status", t.key())))
    }
}

/// Per-frame tracking data read from the sequence header.
///
/// `transforms`, `filenames` and `validity` are index aligned: entry `i` of
/// each describes the `i`-th transform record of the header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameTransforms {
    /// Row-major 3x4 transforms, one per record.
    pub transforms: Vec<[f32; FLAT_TRANSFORM_LEN]>,
    /// Image filename derived for each record.
    pub filenames: Vec<String>,
    /// Transform names found in the header, e.g. `ProbeToTracker`.
    pub tags: BTreeSet<String>,
    /// Whether the tracking data of each record was reported `OK`.
    pub validity: Vec<bool>,
    /// Parsing stopped early on a record with fewer than 12 values.
    pub truncated: bool,
}

impl FrameTransforms {
    /// Number of transform records.
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    /// Whether no transform record was read.
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

/// Directory part of `filename`, including the trailing separator.
///
/// The platform separator is used (`\` on Windows, `/` elsewhere). Returns an
/// empty string when `filename` has no separator.
///
/// Example:
///
/// ```
/// use usnav_io::metafile::directory_of;
///
/// # #[cfg(not(windows))]
/// assert_eq!(directory_of("/data/seq/scan.mha"), "/data/seq/");
/// assert_eq!(directory_of("scan.mha"), "");
/// ```
pub fn directory_of(filename: &str) -> String {
    let separator = std::path::MAIN_SEPARATOR;
    match filename.rfind(separator) {
        Some(pos) => filename[..pos + separator.len_utf8()].to_string(),
        None => String::new(),
    }
}

/// Read the image dimensions and frame count from a sequence header.
///
/// # Arguments
///
/// * `path` - The path to the `.mha` sequence file.
///
/// # Returns
///
/// The dimensions declared by the `DimSize = <cols> <rows> <count>` record.
pub fn read_header_dimensions(path: impl AsRef<Path>) -> Result<SequenceDimensions, SequenceError> {
    let mut reader = BufReader::new(open_sequence(path.as_ref())?);
    read_header_dimensions_from_reader(&mut reader)
}

/// Read the image dimensions from a buffered header.
///
/// Reading stops at the `DimSize` record, at the first blank line or at the
/// pixel data marker, whichever comes first.
pub fn read_header_dimensions_from_reader<R: BufRead>(
    reader: &mut R,
) -> Result<SequenceDimensions, SequenceError> {
    let mut buf = Vec::new();
    while let Some(line) = next_header_line(reader, &mut buf)? {
        if line.trim().is_empty() || line.contains(ELEMENT_DATA_FILE_LOCAL) {
            break;
        }
        if line.contains(DIM_SIZE_KEY) {
            return parse_dimensions(&line);
        }
    }
    Err(SequenceError::DimensionsNotFound)
}

fn parse_dimensions(line: &str) -> Result<SequenceDimensions, SequenceError> {
    let malformed = || SequenceError::MalformedDimensions(line.trim().to_string());
    let (_, values) = line.split_once('=').ok_or_else(malformed)?;
    let values = values
        .split_whitespace()
        .map(|s| s.parse::<usize>().map_err(|_| malformed()))
        .collect::<Result<Vec<_>, _>>()?;
    let [width, height, frame_count] = values.as_slice() else {
        return Err(malformed());
    };
    // the whole pixel payload must be addressable
    width
        .checked_mul(*height)
        .and_then(|frame_len| frame_len.checked_mul(*frame_count))
        .ok_or_else(malformed)?;
    Ok(SequenceDimensions {
        width: *width,
        height: *height,
        frame_count: *frame_count,
    })
}

/// Read the per-frame transforms, validity flags and transform tags.
///
/// Image filenames are derived from the directory of `path` and the name of
/// each transform record, e.g. `/data/Seq_Frame0000_ProbeToTrackerTransform.png`.
///
/// # Arguments
///
/// * `path` - The path to the `.mha` sequence file.
pub fn read_frame_transforms(path: impl AsRef<Path>) -> Result<FrameTransforms, SequenceError> {
    let path = path.as_ref();
    let mut reader = BufReader::new(open_sequence(path)?);
    let dir = directory_of(&path.to_string_lossy());
    read_frame_transforms_from_reader(&mut reader, &dir)
}

/// Read the per-frame transforms from a buffered header.
///
/// Only `ProbeToTrackerTransform` and `UltrasoundToTrackerTransform` records
/// contribute a transform. A record with fewer than 12 numeric values ends the
/// header early and marks the result as truncated. Status records are bound to
/// the transform record with the same frame label and transform name; records
/// without an `OK` or `INVALID` status are reported invalid.
///
/// # Arguments
///
/// * `reader` - Reader positioned at the start of the header.
/// * `dir` - Directory prefix for the derived image filenames.
pub fn read_frame_transforms_from_reader<R: BufRead>(
    reader: &mut R,
    dir: &str,
) -> Result<FrameTransforms, SequenceError> {
    let mut result = FrameTransforms::default();
    let mut record_keys = Vec::new();
    let mut statuses = HashMap::new();

    let mut buf = Vec::new();
    while let Some(line) = next_header_line(reader, &mut buf)? {
        if line.contains(ELEMENT_DATA_FILE_LOCAL) {
            break;
        }

        if let Some(tag) = transform_tag(&line) {
            result.tags.insert(tag.to_string());
        }

        if let Some(kind) = TrackedTransform::find_value_record(&line) {
            let Some((name, values)) = line.split_once('=') else {
                continue;
            };
            let Some(transform) = parse_flat_transform(values) else {
                log::warn!(
                    "Incomplete transform record '{}', stopping after {} frames",
                    name.trim(),
                    result.transforms.len()
                );
                result.truncated = true;
                break;
            };
            result.transforms.push(transform);
            result.filenames.push(format!("{dir}{}.png", name.trim()));
            record_keys.push((frame_label(&line).to_string(), kind));
        } else if let Some(kind) = TrackedTransform::find_status_record(&line) {
            let value = line.split_once('=').map(|(_, v)| v).unwrap_or_default();
            match parse_status(value) {
                Some(valid) => {
                    statuses.insert((frame_label(&line).to_string(), kind), valid);
                }
                None => log::debug!("Skipping unknown transform status: {}", line.trim()),
            }
        }
    }

    result.validity = record_keys
        .iter()
        .map(|key| match statuses.get(key) {
            Some(valid) => *valid,
            None => {
                log::warn!("No status for {}{}, marking it invalid", key.0, key.1.key());
                false
            }
        })
        .collect();

    log::debug!(
        "Read {} transform records, {} invalid, tags: {:?}",
        result.transforms.len(),
        result.validity.iter().filter(|v| !**v).count(),
        result.tags
    );

    Ok(result)
}

pub(crate) fn open_sequence(path: &Path) -> Result<File, SequenceError> {
    if !path.exists() {
        return Err(SequenceError::FileNotFound(path.to_path_buf()));
    }
    Ok(File::open(path)?)
}

/// Read one header line, lossily decoded and without its line terminator.
///
/// Returns `None` at end of input.
pub(crate) fn next_header_line<R: BufRead>(
    reader: &mut R,
    buf: &mut Vec<u8>,
) -> Result<Option<String>, SequenceError> {
    buf.clear();
    if reader.read_until(b'\n', buf)? == 0 {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(buf);
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

// `Seq_Frame0012_ProbeToTrackerTransformStatus = OK` -> `0012`
fn frame_label(line: &str) -> &str {
    line.find(FRAME_PREFIX)
        .map(|pos| &line[pos + FRAME_PREFIX.len()..])
        .and_then(|rest| rest.split_once('_').map(|(label, _)| label))
        .unwrap_or_default()
}

// `Seq_Frame0012_ProbeToTrackerTransformStatus = OK` -> `ProbeToTracker`
fn transform_tag(line: &str) -> Option<&str> {
    let start = line.find(FRAME_PREFIX)? + FRAME_PREFIX.len();
    let rest = &line[start..];
    let rest = &rest[rest.find('_')? + 1..];
    let end = rest.find(TRANSFORM_TOKEN)?;
    Some(&rest[..end]).filter(|tag| !tag.is_empty())
}

fn parse_flat_transform(values: &str) -> Option<[f32; FLAT_TRANSFORM_LEN]> {
    let mut transform = [0.0f32; FLAT_TRANSFORM_LEN];
    let mut tokens = values.split_whitespace();
    for value in transform.iter_mut() {
        *value = tokens.next()?.parse().ok()?;
    }
    Some(transform)
}

fn parse_status(value: &str) -> Option<bool> {
    if value.contains("OK") {
        Some(true)
    } else if value.contains("INVALID") {
        Some(false)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const IDENTITY_RECORD: &str = "1 0 0 0 0 1 0 0 0 0 1 0 0 0 0 1";

    fn read_transforms(header: &str) -> FrameTransforms {
        let mut reader = BufReader::new(header.as_bytes());
        read_frame_transforms_from_reader(&mut reader, "/data/").unwrap()
    }

    #[test]
    fn test_parse_sample_header() -> Result<(), Box<dyn std::error::Error>> {
        let _ = env_logger::builder().is_test(true).try_init();
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("sample.mha");
        let mut file = File::create(&file_path)?;
        writeln!(file, "ObjectType = Image")?;
        writeln!(file, "NDims = 3")?;
        writeln!(file, "DimSize = 640 480 10")?;
        writeln!(file, "Seq_Frame0000_ProbeToTrackerTransform = {IDENTITY_RECORD}")?;
        writeln!(file, "Seq_Frame0000_ProbeToTrackerTransformStatus = OK")?;
        writeln!(file, "{ELEMENT_DATA_FILE_LOCAL}")?;
        file.write_all(&[0u8, 255, 10, 13])?;
        drop(file);

        let dims = read_header_dimensions(&file_path)?;
        assert_eq!(
            dims,
            SequenceDimensions {
                width: 640,
                height: 480,
                frame_count: 10
            }
        );

        let frames = read_frame_transforms(&file_path)?;
        assert_eq!(frames.len(), 1);
        assert_eq!(
            frames.transforms[0],
            [1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0]
        );
        assert_eq!(frames.validity, vec![true]);
        assert!(!frames.truncated);
        assert_eq!(
            frames.tags.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["ProbeToTracker"]
        );

        let expected = format!(
            "{}Seq_Frame0000_ProbeToTrackerTransform.png",
            directory_of(&file_path.to_string_lossy())
        );
        assert_eq!(frames.filenames[0], expected);
        assert!(expected.starts_with(&*tmp_dir.path().to_string_lossy()));
        Ok(())
    }

    #[test]
    fn test_truncated_record() {
        let header = format!(
            "Seq_Frame0000_ProbeToTrackerTransform = {IDENTITY_RECORD}\n\
             Seq_Frame0000_ProbeToTrackerTransformStatus = OK\n\
             Seq_Frame0001_ProbeToTrackerTransform = 1 0 0 0 0 1 0 0\n\
             Seq_Frame0001_ProbeToTrackerTransformStatus = OK\n\
             Seq_Frame0002_ProbeToTrackerTransform = {IDENTITY_RECORD}\n\
             {ELEMENT_DATA_FILE_LOCAL}\n"
        );
        let frames = read_transforms(&header);
        assert!(frames.truncated);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames.validity, vec![true]);
        assert_eq!(frames.filenames.len(), 1);
    }

    #[test]
    fn test_non_numeric_value_truncates() {
        let header = "Seq_Frame0000_ProbeToTrackerTransform = 1 0 0 x 0 1 0 0 0 0 1 0\n";
        let frames = read_transforms(header);
        assert!(frames.truncated);
        assert!(frames.is_empty());
    }

    #[test]
    fn test_validity_pattern_and_ultrasound_records() {
        let header = format!(
            "Seq_Frame0000_UltrasoundToTrackerTransform = {IDENTITY_RECORD}\n\
             Seq_Frame0000_UltrasoundToTrackerTransformStatus = OK\n\
             Seq_Frame0001_UltrasoundToTrackerTransform = {IDENTITY_RECORD}\n\
             Seq_Frame0001_UltrasoundToTrackerTransformStatus = INVALID\n\
             Seq_Frame0002_UltrasoundToTrackerTransform = {IDENTITY_RECORD}\n\
             Seq_Frame0002_UltrasoundToTrackerTransformStatus = OK\n\
             Seq_Frame0003_UltrasoundToTrackerTransform = {IDENTITY_RECORD}\n\
             Seq_Frame0003_UltrasoundToTrackerTransformStatus = INVALID\n"
        );
        let frames = read_transforms(&header);
        assert_eq!(frames.len(), 4);
        assert_eq!(frames.validity, vec![true, false, true, false]);
        assert_eq!(
            frames.filenames[3],
            "/data/Seq_Frame0003_UltrasoundToTrackerTransform.png"
        );
    }

    #[test]
    fn test_status_bound_by_frame_label() {
        // statuses listed before their transforms and out of order
        let header = format!(
            "Seq_Frame0001_ProbeToTrackerTransformStatus = OK\n\
             Seq_Frame0000_ProbeToTrackerTransformStatus = INVALID\n\
             Seq_Frame0000_ProbeToTrackerTransform = {IDENTITY_RECORD}\n\
             Seq_Frame0001_ProbeToTrackerTransform = {IDENTITY_RECORD}\n\
             Seq_Frame0002_ProbeToTrackerTransform = {IDENTITY_RECORD}\n\
             Seq_Frame0002_ProbeToTrackerTransformStatus = MISSING\n"
        );
        let frames = read_transforms(&header);
        assert_eq!(frames.validity, vec![false, true, false]);
    }

    #[test]
    fn test_tags_from_every_transform_line() {
        let header = format!(
            "Seq_Frame0000_ProbeToTrackerTransform = {IDENTITY_RECORD}\n\
             Seq_Frame0000_ProbeToTrackerTransformStatus = OK\n\
             Seq_Frame0000_StylusToTrackerTransform = {IDENTITY_RECORD}\n\
             Seq_Frame0000_StylusToTrackerTransformStatus = INVALID\n\
             Seq_Frame0000_ReferenceToTrackerTransformStatus = OK\n\
             Seq_Frame0000_Timestamp = 12.5\n"
        );
        let frames = read_transforms(&header);
        assert_eq!(
            frames.tags.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["ProbeToTracker", "ReferenceToTracker", "StylusToTracker"]
        );
        // only probe and ultrasound transforms contribute frames
        assert_eq!(frames.len(), 1);
        assert_eq!(frames.validity, vec![true]);
    }

    #[test]
    fn test_parsing_stops_at_pixel_data() {
        let header = format!(
            "Seq_Frame0000_ProbeToTrackerTransform = {IDENTITY_RECORD}\n\
             Seq_Frame0000_ProbeToTrackerTransformStatus = OK\n\
             {ELEMENT_DATA_FILE_LOCAL}\n\
             Seq_Frame0001_ProbeToTrackerTransform = {IDENTITY_RECORD}\n"
        );
        let frames = read_transforms(&header);
        assert_eq!(frames.len(), 1);
        assert!(!frames.truncated);
    }

    #[test]
    fn test_crlf_header() {
        let header = format!(
            "DimSize = 4 2 1\r\n\
             Seq_Frame0000_ProbeToTrackerTransform = {IDENTITY_RECORD}\r\n\
             Seq_Frame0000_ProbeToTrackerTransformStatus = OK\r\n"
        );
        let dims = read_header_dimensions_from_reader(&mut header.as_bytes()).unwrap();
        assert_eq!((dims.width, dims.height, dims.frame_count), (4, 2, 1));
        let frames = read_transforms(&header);
        assert_eq!(frames.validity, vec![true]);
    }

    #[test]
    fn test_dimensions_not_found() {
        let header = "ObjectType = Image\nNDims = 3\n\nDimSize = 1 2 3\n";
        let res = read_header_dimensions_from_reader(&mut header.as_bytes());
        assert!(matches!(res, Err(SequenceError::DimensionsNotFound)));
    }

    #[test]
    fn test_dimensions_malformed() {
        for header in ["DimSize = 640 480\n", "DimSize = 640 480 10 2\n", "DimSize = a b c\n"] {
            let res = read_header_dimensions_from_reader(&mut header.as_bytes());
            assert!(
                matches!(res, Err(SequenceError::MalformedDimensions(_))),
                "{header}"
            );
        }
    }

    #[test]
    fn test_dimensions_overflow() {
        let header = "DimSize = 4294967296 4294967296 2\n";
        let res = read_header_dimensions_from_reader(&mut header.as_bytes());
        assert!(matches!(res, Err(SequenceError::MalformedDimensions(_))));

        let header = format!("DimSize = {} 2 1\n", usize::MAX);
        let res = read_header_dimensions_from_reader(&mut header.as_bytes());
        assert!(matches!(res, Err(SequenceError::MalformedDimensions(_))));
    }

    #[test]
    fn test_missing_file() {
        let res = read_frame_transforms("/nonexistent/sequence.mha");
        assert!(matches!(res, Err(SequenceError::FileNotFound(_))));
        let res = read_header_dimensions("/nonexistent/sequence.mha");
        assert!(matches!(res, Err(SequenceError::FileNotFound(_))));
    }

    #[test]
    fn test_directory_of() {
        let sep = std::path::MAIN_SEPARATOR;
        let path = format!("data{sep}seq{sep}scan.mha");
        assert_eq!(directory_of(&path), format!("data{sep}seq{sep}"));
        assert_eq!(directory_of("scan.mha"), "");
    }

    #[test]
    fn test_transform_tag_and_label() {
        let line = "Seq_Frame0012_ProbeToTrackerTransformStatus = OK";
        assert_eq!(transform_tag(line), Some("ProbeToTracker"));
        assert_eq!(frame_label(line), "0012");
        assert_eq!(transform_tag("Seq_Frame0012_Timestamp = 1"), None);
    }
}
