use hdf5::types::{TypeDescriptor, VarLenAscii, VarLenUnicode};
use hdf5::{Attribute, File, Group};
use std::fmt::Display;
use std::path::{Path, PathBuf};

use super::channel_map::{ChannelMap, ChannelMapSource};
use super::error::{ContainerError, RangeError};
use super::fragment::Fragment;
use super::record_selector::{parse_record_range_within, RecordSelection};

const TRIGGER_RECORD_PREFIX: &str = "TriggerRecord";
const TIME_SLICE_PREFIX: &str = "TimeSlice";
const HEADER_SUFFIX: &str = "Header";
const RUN_NUMBER_ATTR: &str = "run_number";

/// Identifies a record (trigger record or time slice) by its top-level group in the container
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RecordId {
    pub number: u64,
    pub sequence: u16,
    pub group: String,
}

impl RecordId {
    /// Parse a group name of the form `TriggerRecordNNNNN.SSSS` or `TimeSliceNNNNNN`
    pub fn parse(group: &str) -> Option<Self> {
        let name = group.trim_start_matches('/');
        if let Some(rest) = name.strip_prefix(TRIGGER_RECORD_PREFIX) {
            let (number, sequence) = match rest.split_once('.') {
                Some((n, s)) => (n.parse().ok()?, s.parse().ok()?),
                None => (rest.parse().ok()?, 0),
            };
            Some(Self {
                number,
                sequence,
                group: name.to_string(),
            })
        } else if let Some(rest) = name.strip_prefix(TIME_SLICE_PREFIX) {
            Some(Self {
                number: rest.parse().ok()?,
                sequence: 0,
                group: name.to_string(),
            })
        } else {
            None
        }
    }
}

impl RecordId {
    /// Short label for output file names: the record number, followed by the sequence number
    /// when the record was split into several sequences
    pub fn file_label(&self) -> String {
        if self.sequence == 0 {
            self.number.to_string()
        } else {
            format!("{}.{:04}", self.number, self.sequence)
        }
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.group)
    }
}

fn describe_attribute(attr: &Attribute) -> Result<String, hdf5::Error> {
    let value = match attr.dtype()?.to_descriptor()? {
        TypeDescriptor::Integer(_) => attr.read_scalar::<i64>()?.to_string(),
        TypeDescriptor::Unsigned(_) => attr.read_scalar::<u64>()?.to_string(),
        TypeDescriptor::Float(_) => attr.read_scalar::<f64>()?.to_string(),
        TypeDescriptor::Boolean => attr.read_scalar::<bool>()?.to_string(),
        TypeDescriptor::VarLenUnicode => attr.read_scalar::<VarLenUnicode>()?.to_string(),
        TypeDescriptor::VarLenAscii => attr.read_scalar::<VarLenAscii>()?.to_string(),
        other => format!("<{other:?}>"),
    };
    Ok(value)
}

fn collect_fragment_paths(group: &Group, paths: &mut Vec<String>) -> Result<(), hdf5::Error> {
    for dataset in group.datasets()? {
        let name = dataset.name();
        if !name.ends_with(HEADER_SUFFIX) {
            paths.push(name);
        }
    }
    for subgroup in group.groups()? {
        collect_fragment_paths(&subgroup, paths)?;
    }
    Ok(())
}

/// Read-only access to a DAQ HDF5 container.
///
/// The file handle is held for the lifetime of the DaqFile. Records are listed once at open,
/// sorted by record and sequence number.
#[derive(Debug)]
pub struct DaqFile {
    file: File,
    path: PathBuf,
    records: Vec<RecordId>,
}

impl DaqFile {
    pub fn open(path: &Path) -> Result<Self, ContainerError> {
        if !path.exists() {
            return Err(ContainerError::BadFilePath(path.to_path_buf()));
        }
        let file = File::open(path)?;
        let mut records: Vec<RecordId> = file
            .member_names()?
            .iter()
            .filter_map(|name| RecordId::parse(name))
            .collect();
        records.sort();
        Ok(Self {
            file,
            path: path.to_path_buf(),
            records,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name and rendered value of every file level attribute
    pub fn attributes(&self) -> Result<Vec<(String, String)>, ContainerError> {
        let mut attributes = Vec::new();
        for name in self.file.attr_names()? {
            let value = match self.file.attr(&name).and_then(|attr| describe_attribute(&attr)) {
                Ok(value) => value,
                Err(e) => format!("<unreadable: {e}>"),
            };
            attributes.push((name, value));
        }
        Ok(attributes)
    }

    pub fn run_number(&self) -> Result<u32, ContainerError> {
        Ok(self.file.attr(RUN_NUMBER_ATTR)?.read_scalar::<u32>()?)
    }

    pub fn record_ids(&self) -> &[RecordId] {
        &self.records
    }

    /// Apply a selection to the record listing, in selection order
    pub fn select_records(
        &self,
        selection: &RecordSelection,
    ) -> Result<Vec<RecordId>, ContainerError> {
        match selection {
            RecordSelection::All => Ok(self.records.clone()),
            RecordSelection::Range(expression) => {
                let indices = parse_record_range_within(expression, self.records.len())
                    .map_err(|e| match e {
                        RangeError::OutOfRange { index, count } => {
                            ContainerError::RecordOutOfRange(index, count)
                        }
                        other => ContainerError::RangeError(other),
                    })?;
                Ok(indices.into_iter().map(|idx| self.records[idx].clone()).collect())
            }
        }
    }

    /// Full paths of every fragment dataset below a record. Header datasets are excluded.
    pub fn fragment_paths(&self, record: &RecordId) -> Result<Vec<String>, ContainerError> {
        let group = self.file.group(&record.group)?;
        let mut paths = Vec::new();
        collect_fragment_paths(&group, &mut paths)?;
        paths.sort();
        Ok(paths)
    }

    /// Read a fragment dataset
    pub fn fragment(&self, path: &str) -> Result<Fragment, ContainerError> {
        let bytes = self.file.dataset(path)?.read_raw::<u8>()?;
        Ok(Fragment::new(bytes)?)
    }
}

/// Open a container, resolve the channel map and select the records to process.
///
/// Logs every file attribute and the number of records in the file.
pub fn open_container(
    path: &Path,
    selection: &RecordSelection,
    map_source: &ChannelMapSource,
) -> Result<(DaqFile, ChannelMap, Vec<RecordId>), ContainerError> {
    let file = DaqFile::open(path)?;
    if let Ok(metadata) = std::fs::metadata(path) {
        log::info!(
            "Opened {} ({})",
            path.to_string_lossy(),
            human_bytes::human_bytes(metadata.len() as f64)
        );
    }
    for (name, value) in file.attributes()? {
        log::info!("File Attribute {name} = {value}");
    }
    log::info!("Number of records: {}", file.record_ids().len());

    let map = ChannelMap::new(map_source)?;
    log::info!("Using channel map {} ({} channels)", map.name(), map.len());

    let records = file.select_records(selection)?;
    Ok((file, map, records))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::channel_map::ChannelMapScheme;
    use crate::constants::FRAGMENT_TYPE_TRIGGER_PRIMITIVE;
    use crate::fragment::FragmentHeader;
    use std::str::FromStr;

    /// Write a container with the given records, each holding its fragments under `RawData`
    pub(crate) fn write_test_file(path: &Path, records: &[(&str, Vec<Fragment>)]) {
        let file = File::create(path).unwrap();
        file.new_attr::<u32>()
            .create(RUN_NUMBER_ATTR)
            .unwrap()
            .write_scalar(&17u32)
            .unwrap();
        file.new_attr::<VarLenUnicode>()
            .create("application_name")
            .unwrap()
            .write_scalar(&VarLenUnicode::from_str("dataflow0").unwrap())
            .unwrap();

        for (name, fragments) in records {
            let group = file.create_group(name).unwrap();
            group
                .new_dataset_builder()
                .with_data([0u8; 8].as_slice())
                .create("TriggerRecordHeader")
                .unwrap();
            let raw = group.create_group("RawData").unwrap();
            for (idx, fragment) in fragments.iter().enumerate() {
                raw.new_dataset_builder()
                    .with_data(fragment.as_bytes())
                    .create(format!("Fragment_{idx:04}").as_str())
                    .unwrap();
            }
        }
    }

    pub(crate) fn tp_fragment(payload: &[u8]) -> Fragment {
        let header = FragmentHeader {
            fragment_type_code: FRAGMENT_TYPE_TRIGGER_PRIMITIVE,
            run_number: 17,
            ..Default::default()
        };
        Fragment::from_parts(header, payload)
    }

    fn sample_file(dir: &Path) -> PathBuf {
        let path = dir.join("run.hdf5");
        write_test_file(
            &path,
            &[
                ("TriggerRecord00002.0000", vec![tp_fragment(&[])]),
                (
                    "TriggerRecord00001.0000",
                    vec![tp_fragment(&[1, 2, 3]), tp_fragment(&[])],
                ),
            ],
        );
        path
    }

    #[test]
    fn test_record_id_parsing() {
        let id = RecordId::parse("TriggerRecord00012.0003").unwrap();
        assert_eq!((id.number, id.sequence), (12, 3));
        let id = RecordId::parse("/TimeSlice000007").unwrap();
        assert_eq!((id.number, id.sequence), (7, 0));
        assert_eq!(id.to_string(), "TimeSlice000007");
        assert!(RecordId::parse("RawData").is_none());
        assert!(RecordId::parse("TriggerRecordXX.0000").is_none());
    }

    #[test]
    fn test_file_label() {
        let first = RecordId::parse("TriggerRecord00001.0000").unwrap();
        let second = RecordId::parse("TriggerRecord00001.0001").unwrap();
        assert_eq!(first.file_label(), "1");
        assert_eq!(second.file_label(), "1.0001");
        assert_eq!(RecordId::parse("TimeSlice000042").unwrap().file_label(), "42");
    }

    #[test]
    fn test_missing_file() {
        let result = DaqFile::open(Path::new("/does/not/exist.hdf5"));
        assert!(matches!(result, Err(ContainerError::BadFilePath(_))));
    }

    #[test]
    fn test_container_access() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_file(dir.path());

        let file = DaqFile::open(&path).unwrap();
        assert_eq!(file.run_number().unwrap(), 17);
        let numbers: Vec<u64> = file.record_ids().iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec![1, 2]);

        let attributes = file.attributes().unwrap();
        assert!(attributes.contains(&(String::from("run_number"), String::from("17"))));
        let application = (String::from("application_name"), String::from("dataflow0"));
        assert!(attributes.contains(&application));

        let paths = file.fragment_paths(&file.record_ids()[0]).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| !p.ends_with("Header")));

        let fragment = file.fragment(&paths[0]).unwrap();
        assert_eq!(fragment.payload(), &[1, 2, 3]);
    }

    #[test]
    fn test_record_selection() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_file(dir.path());
        let source = ChannelMapSource::Scheme(ChannelMapScheme::PD2HD);

        let (_, map, records) =
            open_container(&path, &RecordSelection::Range(String::from("1,0")), &source).unwrap();
        assert_eq!(map.name(), "PD2HDChannelMap");
        assert_eq!(records[0].number, 2);
        assert_eq!(records[1].number, 1);

        let (_, _, records) = open_container(&path, &RecordSelection::All, &source).unwrap();
        assert_eq!(records.len(), 2);

        let (_, _, records) =
            open_container(&path, &RecordSelection::Range(String::from("a")), &source).unwrap();
        assert!(records.is_empty());

        assert!(matches!(
            open_container(&path, &RecordSelection::Range(String::from("5")), &source),
            Err(ContainerError::RecordOutOfRange(5, 2))
        ));
        assert!(matches!(
            open_container(
                &path,
                &RecordSelection::Range(String::from("0-10000000000")),
                &source
            ),
            Err(ContainerError::RecordOutOfRange(10_000_000_000, 2))
        ));
        assert!(matches!(
            open_container(&path, &RecordSelection::Range(String::from("1-")), &source),
            Err(ContainerError::RangeError(RangeError::BadToken { .. }))
        ));
    }
}
