// Raw ADC frames produced by the three generations of warm interface boards.
// Every layout decodes into the same AdcFrame: the link the data came from, the frame
// timestamp and a (ticks x channels) block of ADC counts. The proto WIB and WIB frames hold a
// single tick of 256 channels; the ethernet streamed frame holds 64 ticks of 64 channels.
use bitvec::prelude::*;
use byteorder::{LittleEndian, ReadBytesExt};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::io::Cursor;
use std::str::FromStr;

use super::constants::*;
use super::error::{FrameError, FrontEndError};
use super::fragment::FragmentType;
use super::hardware_id::LinkAddress;
use super::trigger_primitive::{check_item_size, ItemFormat};

const TIMESTAMP_MASK: u64 = 0x7FFF_FFFF_FFFF_FFFF;

/// The ADC content of a single decoded frame
#[derive(Debug, Clone, PartialEq)]
pub struct AdcFrame {
    pub address: LinkAddress,
    pub timestamp: u64,
    /// In-link channel number of the first column of `adc`
    pub channel_offset: u16,
    /// ADC counts, one row per tick and one column per channel
    pub adc: Array2<u16>,
}

impl AdcFrame {
    pub fn n_ticks(&self) -> usize {
        self.adc.nrows()
    }

    pub fn n_channels(&self) -> usize {
        self.adc.ncols()
    }

    /// Timestamp of every tick held by the frame
    pub fn tick_timestamps(&self) -> Vec<u64> {
        (0..self.n_ticks() as u64)
            .map(|tick| self.timestamp + tick * TICKS_PER_SAMPLE)
            .collect()
    }
}

/// Unpack `count` little-endian values of `bits` width from a packed buffer
pub fn unpack_adc(bytes: &[u8], bits: usize, count: usize) -> Vec<u16> {
    bytes
        .view_bits::<Lsb0>()
        .chunks_exact(bits)
        .take(count)
        .map(|word| word.load_le::<u16>())
        .collect()
}

/// Pack values into a little-endian buffer of `bits` wide words
pub fn pack_adc(values: &[u16], bits: usize) -> Vec<u8> {
    let mut packed = bitvec![u8, Lsb0; 0; values.len() * bits];
    for (idx, value) in values.iter().enumerate() {
        packed[idx * bits..(idx + 1) * bits].store_le(*value);
    }
    packed.into_vec()
}

fn extract(word: u64, shift: u32, bits: u32) -> u64 {
    (word >> shift) & ((1 << bits) - 1)
}

/// The ProtoDUNE-SP warm interface board frame
#[derive(Debug)]
pub struct ProtoWibFrame;

impl ItemFormat for ProtoWibFrame {
    type Output = AdcFrame;
    const ITEM_SIZE: usize = PROTO_WIB_FRAME_SIZE;

    fn decode(bytes: &[u8]) -> Result<AdcFrame, FrameError> {
        check_item_size::<Self>(bytes)?;
        let mut cursor = Cursor::new(bytes);
        let word0 = cursor.read_u32::<LittleEndian>()? as u64;
        let _errors = cursor.read_u32::<LittleEndian>()?;
        let timestamp = cursor.read_u64::<LittleEndian>()? & TIMESTAMP_MASK;
        let address = LinkAddress::new(
            extract(word0, 16, 5) as u16,
            extract(word0, 21, 3) as u8,
            extract(word0, 13, 3) as u8,
        );

        let block_size =
            PROTO_WIB_BLOCK_HEADER_SIZE + PROTO_WIB_BLOCK_CHANNELS * PROTO_WIB_ADC_BITS / 8;
        let mut adc = Array2::<u16>::zeros((1, CHANNELS_PER_LINK));
        for block in 0..PROTO_WIB_BLOCKS {
            let start = PROTO_WIB_HEADER_SIZE + block * block_size + PROTO_WIB_BLOCK_HEADER_SIZE;
            let values = unpack_adc(
                &bytes[start..start + block_size - PROTO_WIB_BLOCK_HEADER_SIZE],
                PROTO_WIB_ADC_BITS,
                PROTO_WIB_BLOCK_CHANNELS,
            );
            for (idx, value) in values.into_iter().enumerate() {
                adc[[0, block * PROTO_WIB_BLOCK_CHANNELS + idx]] = value;
            }
        }

        Ok(AdcFrame {
            address,
            timestamp,
            channel_offset: 0,
            adc,
        })
    }
}

/// The DUNE warm interface board frame
#[derive(Debug)]
pub struct WibFrame;

impl ItemFormat for WibFrame {
    type Output = AdcFrame;
    const ITEM_SIZE: usize = WIB_FRAME_SIZE;

    fn decode(bytes: &[u8]) -> Result<AdcFrame, FrameError> {
        check_item_size::<Self>(bytes)?;
        let mut cursor = Cursor::new(bytes);
        let word0 = cursor.read_u32::<LittleEndian>()? as u64;
        let _reserved = cursor.read_u32::<LittleEndian>()?;
        let timestamp = cursor.read_u64::<LittleEndian>()?;
        let address = LinkAddress::new(
            extract(word0, 12, 8) as u16,
            extract(word0, 20, 4) as u8,
            extract(word0, 24, 6) as u8,
        );

        let adc_bytes = CHANNELS_PER_LINK * WIB_ADC_BITS / 8;
        let values = unpack_adc(
            &bytes[WIB_HEADER_SIZE..WIB_HEADER_SIZE + adc_bytes],
            WIB_ADC_BITS,
            CHANNELS_PER_LINK,
        );
        let adc = Array2::from_shape_vec((1, CHANNELS_PER_LINK), values)?;

        Ok(AdcFrame {
            address,
            timestamp,
            channel_offset: 0,
            adc,
        })
    }
}

/// The ethernet streamed WIB frame: 64 channels over 64 consecutive ticks
#[derive(Debug)]
pub struct WibEthFrame;

impl ItemFormat for WibEthFrame {
    type Output = AdcFrame;
    const ITEM_SIZE: usize = WIB_ETH_FRAME_SIZE;

    fn decode(bytes: &[u8]) -> Result<AdcFrame, FrameError> {
        check_item_size::<Self>(bytes)?;
        let mut cursor = Cursor::new(bytes);
        let word0 = cursor.read_u64::<LittleEndian>()?;
        let timestamp = cursor.read_u64::<LittleEndian>()?;
        // The stream id selects the link (upper bits) and the 64 channel group within it
        let stream = extract(word0, 24, 8);
        let address = LinkAddress::new(
            extract(word0, 10, 10) as u16,
            extract(word0, 20, 4) as u8,
            (stream >> 2) as u8,
        );
        let channel_offset = ((stream & 0x3) as usize * WIB_ETH_CHANNELS) as u16;

        let n_values = WIB_ETH_TICKS * WIB_ETH_CHANNELS;
        let values = unpack_adc(&bytes[WIB_ETH_HEADER_SIZE..], WIB_ADC_BITS, n_values);
        let adc = Array2::from_shape_vec((WIB_ETH_TICKS, WIB_ETH_CHANNELS), values)?;

        Ok(AdcFrame {
            address,
            timestamp,
            channel_offset,
            adc,
        })
    }
}

/// The front-end electronics a raw data fragment came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrontEnd {
    ProtoWib,
    Wib,
    WibEth,
}

impl FrontEnd {
    pub const NAMES: [&'static str; 3] = ["proto_wib", "wib", "wib_eth"];

    /// Infer the front-end from the fragment type recorded in a fragment header
    pub fn infer(fragment_type: FragmentType) -> Result<Self, FrontEndError> {
        match fragment_type {
            FragmentType::ProtoWib => Ok(Self::ProtoWib),
            FragmentType::Wib => Ok(Self::Wib),
            FragmentType::WibEth => Ok(Self::WibEth),
            FragmentType::Unknown(code) => Err(FrontEndError::NotInferable(code)),
            other => Err(FrontEndError::NotInferable(fragment_type_code(other))),
        }
    }

    pub fn frame_size(&self) -> usize {
        match self {
            Self::ProtoWib => ProtoWibFrame::ITEM_SIZE,
            Self::Wib => WibFrame::ITEM_SIZE,
            Self::WibEth => WibEthFrame::ITEM_SIZE,
        }
    }
}

fn fragment_type_code(fragment_type: FragmentType) -> u32 {
    match fragment_type {
        FragmentType::ProtoWib => FRAGMENT_TYPE_PROTO_WIB,
        FragmentType::Wib => FRAGMENT_TYPE_WIB,
        FragmentType::Daphne => FRAGMENT_TYPE_DAPHNE,
        FragmentType::FwTriggerPrimitive => FRAGMENT_TYPE_FW_TRIGGER_PRIMITIVE,
        FragmentType::TriggerPrimitive => FRAGMENT_TYPE_TRIGGER_PRIMITIVE,
        FragmentType::TriggerActivity => FRAGMENT_TYPE_TRIGGER_ACTIVITY,
        FragmentType::TriggerCandidate => FRAGMENT_TYPE_TRIGGER_CANDIDATE,
        FragmentType::WibEth => FRAGMENT_TYPE_WIB_ETH,
        FragmentType::Unknown(code) => code,
    }
}

impl FromStr for FrontEnd {
    type Err = FrontEndError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "proto_wib" => Ok(Self::ProtoWib),
            "wib" => Ok(Self::Wib),
            "wib_eth" => Ok(Self::WibEth),
            _ => Err(FrontEndError::Unknown(s.to_string())),
        }
    }
}

impl Display for FrontEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProtoWib => write!(f, "proto_wib"),
            Self::Wib => write!(f, "wib"),
            Self::WibEth => write!(f, "wib_eth"),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn wib_frame_bytes(address: &LinkAddress, timestamp: u64, adc: &[u16]) -> Vec<u8> {
        let word0: u32 = ((address.crate_no as u32) << 12)
            | ((address.slot_no as u32) << 20)
            | ((address.link_no as u32) << 24);
        let mut bytes = Vec::with_capacity(WIB_FRAME_SIZE);
        bytes.extend_from_slice(&word0.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&timestamp.to_le_bytes());
        bytes.extend_from_slice(&pack_adc(adc, WIB_ADC_BITS));
        bytes.extend_from_slice(&[0u8; 8]); // trailer
        bytes
    }

    fn ramp(n: usize, modulo: usize) -> Vec<u16> {
        (0..n).map(|i| (i % modulo) as u16).collect()
    }

    #[test]
    fn test_pack_unpack() {
        let values: Vec<u16> = vec![0, 1, 4095, 2048, 17, 3000];
        let packed = pack_adc(&values, 12);
        assert_eq!(packed.len(), 9);
        assert_eq!(unpack_adc(&packed, 12, values.len()), values);

        let values: Vec<u16> = vec![16383, 0, 8191, 5];
        let packed = pack_adc(&values, 14);
        assert_eq!(packed.len(), 7);
        assert_eq!(unpack_adc(&packed, 14, values.len()), values);
    }

    #[test]
    fn test_proto_wib_frame() {
        let word0: u32 = (3 << 13) | (5 << 16) | (2 << 21);
        let adc = ramp(CHANNELS_PER_LINK, 4096);
        let mut bytes = Vec::with_capacity(PROTO_WIB_FRAME_SIZE);
        bytes.extend_from_slice(&word0.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&(123_456u64 | (1 << 63)).to_le_bytes());
        for block in adc.chunks(PROTO_WIB_BLOCK_CHANNELS) {
            bytes.extend_from_slice(&[0u8; PROTO_WIB_BLOCK_HEADER_SIZE]);
            bytes.extend_from_slice(&pack_adc(block, PROTO_WIB_ADC_BITS));
        }
        assert_eq!(bytes.len(), PROTO_WIB_FRAME_SIZE);

        let frame = ProtoWibFrame::decode(&bytes).unwrap();
        assert_eq!(frame.address, LinkAddress::new(5, 2, 3));
        assert_eq!(frame.timestamp, 123_456);
        assert_eq!(frame.n_ticks(), 1);
        assert_eq!(frame.adc.row(0).to_vec(), adc);
    }

    #[test]
    fn test_wib_frame() {
        let address = LinkAddress::new(4, 3, 2);
        let adc = ramp(CHANNELS_PER_LINK, 16384);
        let bytes = wib_frame_bytes(&address, 99, &adc);
        assert_eq!(bytes.len(), WIB_FRAME_SIZE);

        let frame = WibFrame::decode(&bytes).unwrap();
        assert_eq!(frame.address, address);
        assert_eq!(frame.timestamp, 99);
        assert_eq!(frame.n_channels(), CHANNELS_PER_LINK);
        assert_eq!(frame.adc[[0, 200]], 200);
    }

    #[test]
    fn test_wib_eth_frame() {
        // crate 7, slot 1, stream 0b000101 -> link 1, channel group 1
        let word0: u64 = (7 << 10) | (1 << 20) | (0b101 << 24);
        let adc: Vec<u16> = (0..WIB_ETH_TICKS * WIB_ETH_CHANNELS)
            .map(|i| (i / WIB_ETH_CHANNELS) as u16 * 100 + (i % WIB_ETH_CHANNELS) as u16)
            .collect();
        let mut bytes = Vec::with_capacity(WIB_ETH_FRAME_SIZE);
        bytes.extend_from_slice(&word0.to_le_bytes());
        bytes.extend_from_slice(&1_000u64.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 16]);
        bytes.extend_from_slice(&pack_adc(&adc, WIB_ADC_BITS));
        assert_eq!(bytes.len(), WIB_ETH_FRAME_SIZE);

        let frame = WibEthFrame::decode(&bytes).unwrap();
        assert_eq!(frame.address, LinkAddress::new(7, 1, 1));
        assert_eq!(frame.channel_offset, 64);
        assert_eq!(frame.n_ticks(), WIB_ETH_TICKS);
        assert_eq!(frame.n_channels(), WIB_ETH_CHANNELS);
        assert_eq!(frame.adc[[2, 5]], 205);
        assert_eq!(frame.tick_timestamps()[3], 1_000 + 3 * TICKS_PER_SAMPLE);
    }

    #[test]
    fn test_front_end_selection() {
        for name in FrontEnd::NAMES {
            assert_eq!(FrontEnd::from_str(name).unwrap().to_string(), name);
        }
        assert!(FrontEnd::from_str("daphne").is_err());
        assert_eq!(FrontEnd::infer(FragmentType::WibEth).unwrap(), FrontEnd::WibEth);
        assert!(matches!(
            FrontEnd::infer(FragmentType::TriggerPrimitive),
            Err(FrontEndError::NotInferable(6))
        ));
        assert_eq!(FrontEnd::Wib.frame_size(), 472);
    }

    #[test]
    fn test_shape_error_is_reported() {
        let bad = Array2::<u16>::from_shape_vec((2, 2), vec![1, 2, 3]).unwrap_err();
        assert!(matches!(FrameError::from(bad), FrameError::ShapeError(_)));
    }
}
