use byteorder::{LittleEndian, ReadBytesExt};
use std::fmt::Display;
use std::io::Cursor;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use super::constants::*;
use super::error::FragmentError;

/// The kind of payload a fragment carries, as given by the fragment type code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentType {
    ProtoWib,
    Wib,
    Daphne,
    FwTriggerPrimitive,
    TriggerPrimitive,
    TriggerActivity,
    TriggerCandidate,
    WibEth,
    Unknown(u32),
}

impl From<u32> for FragmentType {
    fn from(value: u32) -> Self {
        match value {
            FRAGMENT_TYPE_PROTO_WIB => Self::ProtoWib,
            FRAGMENT_TYPE_WIB => Self::Wib,
            FRAGMENT_TYPE_DAPHNE => Self::Daphne,
            FRAGMENT_TYPE_FW_TRIGGER_PRIMITIVE => Self::FwTriggerPrimitive,
            FRAGMENT_TYPE_TRIGGER_PRIMITIVE => Self::TriggerPrimitive,
            FRAGMENT_TYPE_TRIGGER_ACTIVITY => Self::TriggerActivity,
            FRAGMENT_TYPE_TRIGGER_CANDIDATE => Self::TriggerCandidate,
            FRAGMENT_TYPE_WIB_ETH => Self::WibEth,
            other => Self::Unknown(other),
        }
    }
}

impl FragmentType {
    pub fn is_trigger_primitive(&self) -> bool {
        matches!(self, Self::TriggerPrimitive | Self::FwTriggerPrimitive)
    }

    /// Whether the fragment certainly does not hold trigger primitives
    pub fn is_known_non_tp(&self) -> bool {
        !self.is_trigger_primitive() && !matches!(self, Self::Unknown(_))
    }
}

impl Display for FragmentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProtoWib => write!(f, "ProtoWIB"),
            Self::Wib => write!(f, "WIB"),
            Self::Daphne => write!(f, "DAPHNE"),
            Self::FwTriggerPrimitive => write!(f, "FW_TriggerPrimitive"),
            Self::TriggerPrimitive => write!(f, "TriggerPrimitive"),
            Self::TriggerActivity => write!(f, "TriggerActivity"),
            Self::TriggerCandidate => write!(f, "TriggerCandidate"),
            Self::WibEth => write!(f, "WIBEth"),
            Self::Unknown(code) => write!(f, "Unknown({code})"),
        }
    }
}

/// Identifies the readout unit that produced a fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SourceId {
    pub version: u16,
    pub subsystem: u16,
    pub id: u32,
}

impl Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "subsystem: {} id: {:#010x}", self.subsystem, self.id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FragmentHeader {
    pub marker: u32,
    pub version: u32,
    pub size: u64,
    pub trigger_number: u64,
    pub trigger_timestamp: u64,
    pub window_begin: u64,
    pub window_end: u64,
    pub run_number: u32,
    pub error_bits: u32,
    pub fragment_type_code: u32,
    pub sequence_number: u16,
    pub detector_id: u16,
    pub element_id: SourceId,
}

impl FragmentHeader {
    /// Parse the fixed size header at the start of a fragment buffer
    pub fn read(buffer: &[u8]) -> Result<Self, FragmentError> {
        if buffer.len() < FRAGMENT_HEADER_SIZE {
            return Err(FragmentError::TooShort(buffer.len()));
        }
        let mut cursor = Cursor::new(buffer);
        let marker = cursor.read_u32::<LittleEndian>()?;
        if marker != FRAGMENT_HEADER_MARKER {
            return Err(FragmentError::BadMarker(marker));
        }
        Ok(Self {
            marker,
            version: cursor.read_u32::<LittleEndian>()?,
            size: cursor.read_u64::<LittleEndian>()?,
            trigger_number: cursor.read_u64::<LittleEndian>()?,
            trigger_timestamp: cursor.read_u64::<LittleEndian>()?,
            window_begin: cursor.read_u64::<LittleEndian>()?,
            window_end: cursor.read_u64::<LittleEndian>()?,
            run_number: cursor.read_u32::<LittleEndian>()?,
            error_bits: cursor.read_u32::<LittleEndian>()?,
            fragment_type_code: cursor.read_u32::<LittleEndian>()?,
            sequence_number: cursor.read_u16::<LittleEndian>()?,
            detector_id: cursor.read_u16::<LittleEndian>()?,
            element_id: SourceId {
                version: cursor.read_u16::<LittleEndian>()?,
                subsystem: cursor.read_u16::<LittleEndian>()?,
                id: cursor.read_u32::<LittleEndian>()?,
            },
        })
    }

    /// Serialize the header into its on-disk layout
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(FRAGMENT_HEADER_SIZE);
        bytes.extend_from_slice(&self.marker.to_le_bytes());
        bytes.extend_from_slice(&self.version.to_le_bytes());
        bytes.extend_from_slice(&self.size.to_le_bytes());
        bytes.extend_from_slice(&self.trigger_number.to_le_bytes());
        bytes.extend_from_slice(&self.trigger_timestamp.to_le_bytes());
        bytes.extend_from_slice(&self.window_begin.to_le_bytes());
        bytes.extend_from_slice(&self.window_end.to_le_bytes());
        bytes.extend_from_slice(&self.run_number.to_le_bytes());
        bytes.extend_from_slice(&self.error_bits.to_le_bytes());
        bytes.extend_from_slice(&self.fragment_type_code.to_le_bytes());
        bytes.extend_from_slice(&self.sequence_number.to_le_bytes());
        bytes.extend_from_slice(&self.detector_id.to_le_bytes());
        bytes.extend_from_slice(&self.element_id.version.to_le_bytes());
        bytes.extend_from_slice(&self.element_id.subsystem.to_le_bytes());
        bytes.extend_from_slice(&self.element_id.id.to_le_bytes());
        bytes
    }

    pub fn fragment_type(&self) -> FragmentType {
        FragmentType::from(self.fragment_type_code)
    }
}

/// A fragment: the header plus the raw bytes of one readout unit's data for a record.
#[derive(Debug, Clone)]
pub struct Fragment {
    header: FragmentHeader,
    bytes: Vec<u8>,
}

impl Fragment {
    /// Take ownership of a fragment buffer (header included) and parse its header.
    ///
    /// The size recorded in the header must match the buffer.
    pub fn new(bytes: Vec<u8>) -> Result<Self, FragmentError> {
        let header = FragmentHeader::read(&bytes)?;
        if header.size != bytes.len() as u64 {
            return Err(FragmentError::SizeMismatch(header.size, bytes.len()));
        }
        Ok(Self { header, bytes })
    }

    /// Build a fragment from a header and a payload, fixing up the header size
    pub fn from_parts(mut header: FragmentHeader, payload: &[u8]) -> Self {
        header.marker = FRAGMENT_HEADER_MARKER;
        header.size = (FRAGMENT_HEADER_SIZE + payload.len()) as u64;
        let mut bytes = header.to_bytes();
        bytes.extend_from_slice(payload);
        Self { header, bytes }
    }

    pub fn header(&self) -> &FragmentHeader {
        &self.header
    }

    /// Total size of the fragment in bytes, header included
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn header_size(&self) -> usize {
        FRAGMENT_HEADER_SIZE
    }

    /// The bytes following the header
    pub fn payload(&self) -> &[u8] {
        &self.bytes[FRAGMENT_HEADER_SIZE..]
    }

    /// The whole fragment buffer
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Log the fragment header
    pub fn log_header(&self, path: &str) {
        let header = &self.header;
        log::debug!("Inspecting {path}");
        log::debug!("Run number    : {}", header.run_number);
        log::debug!("Trigger number: {}", header.trigger_number);
        log::debug!(
            "Trigger TS    : {} ({})",
            header.trigger_timestamp,
            format_timestamp(header.trigger_timestamp)
        );
        log::debug!("Window begin  : {}", header.window_begin);
        log::debug!("Window end    : {}", header.window_end);
        log::debug!("Fragment type : {}", header.fragment_type());
        log::debug!("Fragment code : {}", header.fragment_type_code);
        log::debug!("Source ID     : {}", header.element_id);
        log::debug!(
            "Size          : {} ({})",
            self.size(),
            human_bytes::human_bytes(self.size() as f64)
        );
    }
}

/// Render a DAQ timestamp (62.5 MHz ticks since the Unix epoch) as a UTC date
pub fn format_timestamp(timestamp: u64) -> String {
    let nanos = timestamp as i128 * NS_PER_TIMESTAMP_TICK as i128;
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .ok()
        .and_then(|date| date.format(&Rfc3339).ok())
        .unwrap_or_else(|| String::from("invalid timestamp"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> FragmentHeader {
        FragmentHeader {
            version: 5,
            trigger_number: 42,
            trigger_timestamp: 1_000,
            window_begin: 900,
            window_end: 1_100,
            run_number: 17,
            fragment_type_code: FRAGMENT_TYPE_TRIGGER_PRIMITIVE,
            element_id: SourceId {
                version: 1,
                subsystem: 3,
                id: 0x10,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_header_layout() {
        let fragment = Fragment::from_parts(sample_header(), &[0u8; 10]);
        assert_eq!(fragment.header().to_bytes().len(), FRAGMENT_HEADER_SIZE);
        assert_eq!(fragment.size(), FRAGMENT_HEADER_SIZE + 10);
        assert_eq!(fragment.payload().len(), 10);

        let parsed = Fragment::new(fragment.as_bytes().to_vec()).unwrap();
        let header = parsed.header();
        assert_eq!(header.size, (FRAGMENT_HEADER_SIZE + 10) as u64);
        assert_eq!(header.run_number, 17);
        assert_eq!(header.trigger_number, 42);
        assert_eq!(header.window_end, 1_100);
        assert_eq!(header.fragment_type(), FragmentType::TriggerPrimitive);
        assert_eq!(header.element_id.subsystem, 3);
        assert_eq!(header.element_id.id, 0x10);
    }

    #[test]
    fn test_bad_buffers() {
        assert!(matches!(
            Fragment::new(vec![0u8; 10]),
            Err(FragmentError::TooShort(10))
        ));
        assert!(matches!(
            Fragment::new(vec![0u8; FRAGMENT_HEADER_SIZE]),
            Err(FragmentError::BadMarker(0))
        ));

        let fragment = Fragment::from_parts(sample_header(), &[0u8; 8]);
        let mut truncated = fragment.as_bytes().to_vec();
        truncated.pop();
        assert!(matches!(
            Fragment::new(truncated),
            Err(FragmentError::SizeMismatch(_, _))
        ));
    }

    #[test]
    fn test_fragment_types() {
        assert!(FragmentType::from(6).is_trigger_primitive());
        assert!(FragmentType::from(1).is_known_non_tp());
        assert!(!FragmentType::from(99).is_known_non_tp());
        assert_eq!(FragmentType::from(12), FragmentType::WibEth);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01T00:00:00Z");
        // one second is 62.5 million ticks
        assert_eq!(format_timestamp(62_500_000), "1970-01-01T00:00:01Z");
    }
}
