use byteorder::{LittleEndian, ReadBytesExt};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::io::Cursor;
use std::str::FromStr;

use super::constants::{LEGACY_TP_SIZE, PACKED_TP_SIZE};
use super::error::FrameError;

/// A fixed size binary item which can be decoded from a fragment payload
pub trait ItemFormat {
    type Output;
    const ITEM_SIZE: usize;

    /// Decode one item from exactly `ITEM_SIZE` bytes
    fn decode(bytes: &[u8]) -> Result<Self::Output, FrameError>;
}

/// Check an item buffer has the size an ItemFormat expects
pub fn check_item_size<F: ItemFormat>(bytes: &[u8]) -> Result<(), FrameError> {
    if bytes.len() != F::ITEM_SIZE {
        Err(FrameError::BadItemSize(bytes.len(), F::ITEM_SIZE))
    } else {
        Ok(())
    }
}

/// A trigger primitive: a hit found on a single channel by the online hit finder.
///
/// `time_peak` holds the absolute peak tick for the legacy layout and the number of samples
/// from the start to the peak for the packed layout. Likewise `time_over_threshold` is in
/// timestamp ticks (legacy) or samples (packed).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerPrimitive {
    pub version: u16,
    pub time_start: u64,
    pub time_peak: u64,
    pub time_over_threshold: u64,
    pub channel: u32,
    pub adc_integral: u32,
    pub adc_peak: u16,
    pub det_id: u16,
    pub tp_type: u32,
    pub algorithm: u32,
    pub flag: u16,
}

impl TriggerPrimitive {
    pub fn log(&self) {
        log::debug!("version: {}", self.version);
        log::debug!("time_start: {}", self.time_start);
        log::debug!("time_peak: {}", self.time_peak);
        log::debug!("time_over_threshold: {}", self.time_over_threshold);
        log::debug!("channel: {}", self.channel);
        log::debug!("adc_integral: {}", self.adc_integral);
        log::debug!("adc_peak: {}", self.adc_peak);
        log::debug!("det_id: {}", self.det_id);
        log::debug!("type: {}", self.tp_type);
        log::debug!("algorithm: {}", self.algorithm);
        log::debug!("flag: {}", self.flag);
    }
}

/// The original 48 byte trigger primitive
#[derive(Debug)]
pub struct LegacyTp;

impl ItemFormat for LegacyTp {
    type Output = TriggerPrimitive;
    const ITEM_SIZE: usize = LEGACY_TP_SIZE;

    fn decode(bytes: &[u8]) -> Result<TriggerPrimitive, FrameError> {
        check_item_size::<Self>(bytes)?;
        let mut cursor = Cursor::new(bytes);
        let time_start = cursor.read_u64::<LittleEndian>()?;
        let time_peak = cursor.read_u64::<LittleEndian>()?;
        let time_over_threshold = cursor.read_u64::<LittleEndian>()?;
        let channel = cursor.read_u32::<LittleEndian>()?;
        let adc_integral = cursor.read_u32::<LittleEndian>()?;
        let adc_peak = cursor.read_u16::<LittleEndian>()?;
        let det_id = cursor.read_u16::<LittleEndian>()?;
        let tp_type = cursor.read_u32::<LittleEndian>()?;
        let algorithm = cursor.read_u32::<LittleEndian>()?;
        let version = cursor.read_u16::<LittleEndian>()?;
        let flag = cursor.read_u16::<LittleEndian>()?;
        Ok(TriggerPrimitive {
            version,
            time_start,
            time_peak,
            time_over_threshold,
            channel,
            adc_integral,
            adc_peak,
            det_id,
            tp_type,
            algorithm,
            flag,
        })
    }
}

/// The compact 32 byte trigger primitive, with peak and duration counted in samples
#[derive(Debug)]
pub struct PackedTp;

impl ItemFormat for PackedTp {
    type Output = TriggerPrimitive;
    const ITEM_SIZE: usize = PACKED_TP_SIZE;

    fn decode(bytes: &[u8]) -> Result<TriggerPrimitive, FrameError> {
        check_item_size::<Self>(bytes)?;
        let mut cursor = Cursor::new(bytes);
        let time_start = cursor.read_u64::<LittleEndian>()?;
        let samples_to_peak = cursor.read_u16::<LittleEndian>()?;
        let samples_over_threshold = cursor.read_u16::<LittleEndian>()?;
        let channel = cursor.read_u32::<LittleEndian>()?;
        let adc_integral = cursor.read_u32::<LittleEndian>()?;
        let adc_peak = cursor.read_u16::<LittleEndian>()?;
        let det_id = cursor.read_u16::<LittleEndian>()?;
        let version = cursor.read_u16::<LittleEndian>()?;
        let tp_type = cursor.read_u8()?;
        let algorithm = cursor.read_u8()?;
        let flag = cursor.read_u16::<LittleEndian>()?;
        Ok(TriggerPrimitive {
            version,
            time_start,
            time_peak: samples_to_peak as u64,
            time_over_threshold: samples_over_threshold as u64,
            channel,
            adc_integral,
            adc_peak,
            det_id,
            tp_type: tp_type as u32,
            algorithm: algorithm as u32,
            flag,
        })
    }
}

/// Which trigger primitive layout a fragment holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TpFormat {
    #[default]
    Legacy,
    Packed,
}

impl TpFormat {
    pub const NAMES: [&'static str; 2] = ["legacy", "packed"];

    pub fn item_size(&self) -> usize {
        match self {
            Self::Legacy => LegacyTp::ITEM_SIZE,
            Self::Packed => PackedTp::ITEM_SIZE,
        }
    }
}

impl FromStr for TpFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "legacy" => Ok(Self::Legacy),
            "packed" => Ok(Self::Packed),
            _ => Err(format!("Unrecognized trigger primitive format: {s}")),
        }
    }
}

impl Display for TpFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Legacy => write!(f, "legacy"),
            Self::Packed => write!(f, "packed"),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn legacy_tp_bytes(tp: &TriggerPrimitive) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(LEGACY_TP_SIZE);
        bytes.extend_from_slice(&tp.time_start.to_le_bytes());
        bytes.extend_from_slice(&tp.time_peak.to_le_bytes());
        bytes.extend_from_slice(&tp.time_over_threshold.to_le_bytes());
        bytes.extend_from_slice(&tp.channel.to_le_bytes());
        bytes.extend_from_slice(&tp.adc_integral.to_le_bytes());
        bytes.extend_from_slice(&tp.adc_peak.to_le_bytes());
        bytes.extend_from_slice(&tp.det_id.to_le_bytes());
        bytes.extend_from_slice(&tp.tp_type.to_le_bytes());
        bytes.extend_from_slice(&tp.algorithm.to_le_bytes());
        bytes.extend_from_slice(&tp.version.to_le_bytes());
        bytes.extend_from_slice(&tp.flag.to_le_bytes());
        bytes
    }

    pub(crate) fn sample_tp(channel: u32) -> TriggerPrimitive {
        TriggerPrimitive {
            version: 1,
            time_start: 1_000 + channel as u64,
            time_peak: 1_010 + channel as u64,
            time_over_threshold: 64,
            channel,
            adc_integral: 500,
            adc_peak: 40,
            det_id: 3,
            tp_type: 1,
            algorithm: 1,
            flag: 0,
        }
    }

    #[test]
    fn test_legacy_decode() {
        let tp = sample_tp(1234);
        let bytes = legacy_tp_bytes(&tp);
        assert_eq!(bytes.len(), LegacyTp::ITEM_SIZE);
        assert_eq!(LegacyTp::decode(&bytes).unwrap(), tp);
    }

    #[test]
    fn test_packed_decode() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&5_000u64.to_le_bytes()); // time_start
        bytes.extend_from_slice(&7u16.to_le_bytes()); // samples_to_peak
        bytes.extend_from_slice(&12u16.to_le_bytes()); // samples_over_threshold
        bytes.extend_from_slice(&2048u32.to_le_bytes()); // channel
        bytes.extend_from_slice(&900u32.to_le_bytes()); // adc_integral
        bytes.extend_from_slice(&80u16.to_le_bytes()); // adc_peak
        bytes.extend_from_slice(&10u16.to_le_bytes()); // det_id
        bytes.extend_from_slice(&2u16.to_le_bytes()); // version
        bytes.push(1); // type
        bytes.push(2); // algorithm
        bytes.extend_from_slice(&0u16.to_le_bytes()); // flag
        bytes.extend_from_slice(&[0u8; 2]); // reserved
        assert_eq!(bytes.len(), PackedTp::ITEM_SIZE);

        let tp = PackedTp::decode(&bytes).unwrap();
        assert_eq!(tp.time_start, 5_000);
        assert_eq!(tp.time_peak, 7);
        assert_eq!(tp.time_over_threshold, 12);
        assert_eq!(tp.channel, 2048);
        assert_eq!(tp.adc_integral, 900);
        assert_eq!(tp.adc_peak, 80);
        assert_eq!(tp.det_id, 10);
        assert_eq!(tp.version, 2);
        assert_eq!(tp.algorithm, 2);
    }

    #[test]
    fn test_wrong_size_is_rejected() {
        assert!(matches!(
            LegacyTp::decode(&[0u8; 10]),
            Err(FrameError::BadItemSize(10, LEGACY_TP_SIZE))
        ));
    }

    #[test]
    fn test_format_names() {
        for name in TpFormat::NAMES {
            assert_eq!(TpFormat::from_str(name).unwrap().to_string(), name);
        }
        assert_eq!(TpFormat::Packed.item_size(), 32);
        assert!(TpFormat::from_str("v3").is_err());
    }
}
