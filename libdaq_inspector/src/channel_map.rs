// Channel maps translate the hardware address of a readout channel
// [crate, slot, link, channel] -> offline channel
// and then the offline channel into the physical information the analysis cares about
// offline channel -> (plane, element name)
// Both directions are stored as flat hash maps. The named schemes are generated from a
// small geometry description (one entry per APA/CRP), custom maps are read from a CSV file.
use std::fmt::Display;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::constants::CHANNELS_PER_LINK;
use super::error::ChannelMapError;
use super::hardware_id::{generate_uuid, ChannelInfo, LinkAddress, Plane};

const CSV_ENTRIES_PER_LINE: usize = 7; //crate, slot, link, channel, offline, plane, element

/// Readout geometry of a single detector element (an APA or a CRP)
#[derive(Debug, Clone, Copy)]
struct ElementGeometry {
    slots: u8,
    links: u8,
    u_channels: u32,
    v_channels: u32,
    z_channels: u32,
}

impl ElementGeometry {
    fn n_channels(&self) -> u32 {
        self.u_channels + self.v_channels + self.z_channels
    }

    fn plane_of(&self, local_channel: u32) -> Plane {
        if local_channel < self.u_channels {
            Plane::U
        } else if local_channel < self.u_channels + self.v_channels {
            Plane::V
        } else {
            Plane::Z
        }
    }
}

const APA_GEOMETRY: ElementGeometry = ElementGeometry {
    slots: 5,
    links: 2,
    u_channels: 800,
    v_channels: 800,
    z_channels: 960,
};

const CRP_GEOMETRY: ElementGeometry = ElementGeometry {
    slots: 4,
    links: 3,
    u_channels: 952,
    v_channels: 952,
    z_channels: 1168,
};

/// The named channel mapping schemes known to the inspector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ChannelMapScheme {
    #[default]
    VDColdbox,
    ProtoDUNESP1,
    PD2HD,
    HDColdbox,
    PD2VDTPC,
}

impl ChannelMapScheme {
    pub const ALL: [ChannelMapScheme; 5] = [
        Self::VDColdbox,
        Self::ProtoDUNESP1,
        Self::PD2HD,
        Self::HDColdbox,
        Self::PD2VDTPC,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::VDColdbox => "VDColdboxChannelMap",
            Self::ProtoDUNESP1 => "ProtoDUNESP1ChannelMap",
            Self::PD2HD => "PD2HDChannelMap",
            Self::HDColdbox => "HDColdboxChannelMap",
            Self::PD2VDTPC => "PD2VDTPCChannelMap",
        }
    }

    fn geometry(&self) -> ElementGeometry {
        match self {
            Self::VDColdbox | Self::PD2VDTPC => CRP_GEOMETRY,
            Self::ProtoDUNESP1 | Self::PD2HD | Self::HDColdbox => APA_GEOMETRY,
        }
    }

    /// The (crate, element name) pairs of the scheme, in offline channel order
    fn elements(&self) -> &'static [(u16, &'static str)] {
        match self {
            Self::VDColdbox => &[(4, "CRP4")],
            Self::ProtoDUNESP1 => &[
                (1, "APA1"),
                (2, "APA2"),
                (3, "APA3"),
                (4, "APA4"),
                (5, "APA5"),
                (6, "APA6"),
            ],
            Self::PD2HD => &[
                (1, "APA_P02SU"),
                (2, "APA_P01SU"),
                (3, "APA_P02NL"),
                (4, "APA_P01NL"),
            ],
            Self::HDColdbox => &[(1, "APA_HDColdbox")],
            Self::PD2VDTPC => &[(1, "CRP2"), (2, "CRP3"), (3, "CRP4"), (4, "CRP5")],
        }
    }
}

impl FromStr for ChannelMapScheme {
    type Err = ChannelMapError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|scheme| scheme.name() == s)
            .ok_or_else(|| ChannelMapError::UnknownScheme(s.to_string()))
    }
}

impl Display for ChannelMapScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Where a ChannelMap should come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelMapSource {
    Scheme(ChannelMapScheme),
    File(PathBuf),
}

impl Default for ChannelMapSource {
    fn default() -> Self {
        Self::Scheme(ChannelMapScheme::default())
    }
}

/// ChannelMap contains the mapping of the hardware identifiers (crate, slot, link, channel) to
/// offline channel numbers, and of offline channels to their plane and detector element.
///
/// Lookups return Option; a channel missing from the map is a normal outcome that the caller
/// decides how to handle.
#[derive(Debug, Clone, Default)]
pub struct ChannelMap {
    name: String,
    hardware: FxHashMap<u64, u32>,
    offline: FxHashMap<u32, ChannelInfo>,
}

impl ChannelMap {
    /// Create a new ChannelMap from either a named scheme or a CSV file
    pub fn new(source: &ChannelMapSource) -> Result<Self, ChannelMapError> {
        match source {
            ChannelMapSource::Scheme(scheme) => Ok(Self::from_scheme(*scheme)),
            ChannelMapSource::File(path) => Self::from_file(path),
        }
    }

    /// Build the map of a named scheme
    pub fn from_scheme(scheme: ChannelMapScheme) -> Self {
        let geometry = scheme.geometry();
        let mut map = ChannelMap {
            name: scheme.name().to_string(),
            ..Default::default()
        };

        let mut base: u32 = 0;
        for (crate_no, element) in scheme.elements() {
            for slot_no in 0..geometry.slots {
                for link_no in 0..geometry.links {
                    let address = LinkAddress::new(*crate_no, slot_no, link_no);
                    let link_offset =
                        (slot_no as u32 * geometry.links as u32 + link_no as u32)
                            * CHANNELS_PER_LINK as u32;
                    for channel in 0..CHANNELS_PER_LINK as u16 {
                        let local = link_offset + channel as u32;
                        map.insert(
                            &address,
                            &channel,
                            ChannelInfo {
                                offline_channel: base + local,
                                plane: geometry.plane_of(local),
                                element: element.to_string(),
                            },
                        );
                    }
                }
            }
            base += geometry.n_channels();
        }
        map
    }

    /// Read a map from a CSV file
    pub fn from_file(path: &Path) -> Result<Self, ChannelMapError> {
        let mut contents = String::new();
        let mut file = File::open(path)?;
        file.read_to_string(&mut contents)?;
        let mut map = Self::from_csv_str(&contents)?;
        map.name = path.to_string_lossy().to_string();
        Ok(map)
    }

    /// Parse a map from CSV text.
    ///
    /// The first line is a header and is skipped. Every other line must have the columns
    /// `crate,slot,link,channel,offline,plane,element`.
    pub fn from_csv_str(contents: &str) -> Result<Self, ChannelMapError> {
        let mut map = ChannelMap {
            name: String::from("custom"),
            ..Default::default()
        };

        let mut lines = contents.lines();
        lines.next(); // Skip the header
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            let entries: Vec<&str> = line.split_terminator(',').map(|e| e.trim()).collect();
            if entries.len() != CSV_ENTRIES_PER_LINE {
                return Err(ChannelMapError::BadFileFormat);
            }
            let address =
                LinkAddress::new(entries[0].parse()?, entries[1].parse()?, entries[2].parse()?);
            let channel: u16 = entries[3].parse()?;
            let info = ChannelInfo {
                offline_channel: entries[4].parse()?,
                plane: Plane::try_from(entries[5].parse::<u8>()?)?,
                element: entries[6].to_string(),
            };
            map.insert(&address, &channel, info);
        }

        Ok(map)
    }

    fn insert(&mut self, address: &LinkAddress, channel: &u16, info: ChannelInfo) {
        self.hardware
            .insert(generate_uuid(address, channel), info.offline_channel);
        self.offline.insert(info.offline_channel, info);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of offline channels known to the map
    pub fn len(&self) -> usize {
        self.offline.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offline.is_empty()
    }

    /// Get the offline channel of a channel on a given data link.
    ///
    /// If returns None the hardware location does not exist in the map
    pub fn offline_channel(&self, address: &LinkAddress, channel: &u16) -> Option<u32> {
        self.hardware.get(&generate_uuid(address, channel)).copied()
    }

    pub fn channel_info(&self, offline_channel: &u32) -> Option<&ChannelInfo> {
        self.offline.get(offline_channel)
    }

    /// Get the plane of an offline channel, None if the channel is unknown
    pub fn plane(&self, offline_channel: &u32) -> Option<Plane> {
        self.channel_info(offline_channel).map(|info| info.plane)
    }

    /// Get the name of the APA/CRP an offline channel belongs to
    pub fn element_name(&self, offline_channel: &u32) -> Option<&str> {
        self.channel_info(offline_channel)
            .map(|info| info.element.as_str())
    }
}

//Unit tests
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_names_round_trip() {
        for scheme in ChannelMapScheme::ALL {
            assert_eq!(ChannelMapScheme::from_str(scheme.name()).unwrap(), scheme);
        }
        assert!(matches!(
            ChannelMapScheme::from_str("NotAChannelMap"),
            Err(ChannelMapError::UnknownScheme(_))
        ));
    }

    #[test]
    fn test_hd_scheme_layout() {
        let map = ChannelMap::from_scheme(ChannelMapScheme::PD2HD);
        assert_eq!(map.len(), 4 * 2560);

        let first = map.offline_channel(&LinkAddress::new(1, 0, 0), &0).unwrap();
        assert_eq!(first, 0);
        assert_eq!(map.plane(&first), Some(Plane::U));

        // Second APA starts right after the first
        let second = map.offline_channel(&LinkAddress::new(2, 0, 0), &0).unwrap();
        assert_eq!(second, 2560);
        assert_eq!(map.element_name(&second), Some("APA_P01SU"));

        assert_eq!(map.plane(&799), Some(Plane::U));
        assert_eq!(map.plane(&800), Some(Plane::V));
        assert_eq!(map.plane(&1600), Some(Plane::Z));
        assert_eq!(map.plane(&2559), Some(Plane::Z));
    }

    #[test]
    fn test_vd_scheme_layout() {
        let map = ChannelMap::from_scheme(ChannelMapScheme::VDColdbox);
        assert_eq!(map.len(), 3072);
        let last = map
            .offline_channel(&LinkAddress::new(4, 3, 2), &255)
            .unwrap();
        assert_eq!(last, 3071);
        assert_eq!(map.plane(&951), Some(Plane::U));
        assert_eq!(map.plane(&952), Some(Plane::V));
        assert_eq!(map.plane(&1904), Some(Plane::Z));
    }

    #[test]
    fn test_unknown_locations() {
        let map = ChannelMap::from_scheme(ChannelMapScheme::HDColdbox);
        assert!(map.offline_channel(&LinkAddress::new(9, 0, 0), &0).is_none());
        assert!(map.offline_channel(&LinkAddress::new(1, 5, 0), &0).is_none());
        assert!(map.plane(&2560).is_none());
        assert!(map.element_name(&99_999).is_none());
    }

    #[test]
    fn test_csv_map() {
        let contents = "crate,slot,link,channel,offline,plane,element\n\
                        1,0,0,0,100,0,APA1\n\
                        1,0,0,1,101,2,APA1\n";
        let map = ChannelMap::from_csv_str(contents).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.offline_channel(&LinkAddress::new(1, 0, 0), &1), Some(101));
        assert_eq!(map.plane(&101), Some(Plane::Z));
        assert_eq!(map.element_name(&100), Some("APA1"));
    }

    #[test]
    fn test_bad_csv_map() {
        let too_few = "header\n1,0,0,0,100,0\n";
        assert!(matches!(
            ChannelMap::from_csv_str(too_few),
            Err(ChannelMapError::BadFileFormat)
        ));
        let bad_plane = "header\n1,0,0,0,100,4,APA1\n";
        assert!(matches!(
            ChannelMap::from_csv_str(bad_plane),
            Err(ChannelMapError::BadPlane(4))
        ));
        let bad_int = "header\n1,0,x,0,100,0,APA1\n";
        assert!(matches!(
            ChannelMap::from_csv_str(bad_int),
            Err(ChannelMapError::ParsingError(_))
        ));
    }
}
