use super::error::ChannelMapError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Wire plane of a TPC readout channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Plane {
    /// First induction plane
    U,
    /// Second induction plane
    V,
    /// Collection plane
    Z,
}

impl Plane {
    pub const ALL: [Plane; 3] = [Plane::U, Plane::V, Plane::Z];

    /// The numeric plane id used by the offline software (0, 1, 2)
    pub fn id(&self) -> u8 {
        match self {
            Self::U => 0,
            Self::V => 1,
            Self::Z => 2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::U => "u",
            Self::V => "v",
            Self::Z => "z",
        }
    }
}

impl TryFrom<u8> for Plane {
    type Error = ChannelMapError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::U),
            1 => Ok(Self::V),
            2 => Ok(Self::Z),
            _ => Err(ChannelMapError::BadPlane(value)),
        }
    }
}

impl Display for Plane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// The plane id written to tables, with -1 standing in for an unresolved channel
pub fn plane_id_or_sentinel(plane: Option<Plane>) -> i8 {
    match plane {
        Some(p) => p.id() as i8,
        None => -1,
    }
}

/// Hardware location of one front-end data link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LinkAddress {
    pub crate_no: u16,
    pub slot_no: u8,
    pub link_no: u8,
}

impl LinkAddress {
    pub fn new(crate_no: u16, slot_no: u8, link_no: u8) -> Self {
        Self {
            crate_no,
            slot_no,
            link_no,
        }
    }
}

impl Display for LinkAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "crate: {}, slot: {}, link: {}",
            self.crate_no, self.slot_no, self.link_no
        )
    }
}

/// Offline information attached to a single readout channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub offline_channel: u32,
    pub plane: Plane,
    pub element: String,
}

/// Generate a unique id number for a given hardware location
pub fn generate_uuid(address: &LinkAddress, channel: &u16) -> u64 {
    (*channel as u64)
        + (address.link_no as u64) * 1_000
        + (address.slot_no as u64) * 100_000
        + (address.crate_no as u64) * 10_000_000
}
