// Fragment header
pub const FRAGMENT_HEADER_MARKER: u32 = 0x1111_2222;
pub const FRAGMENT_HEADER_SIZE: usize = 72;

// Fragment type codes carried in the header
pub const FRAGMENT_TYPE_PROTO_WIB: u32 = 1;
pub const FRAGMENT_TYPE_WIB: u32 = 2;
pub const FRAGMENT_TYPE_DAPHNE: u32 = 3;
pub const FRAGMENT_TYPE_FW_TRIGGER_PRIMITIVE: u32 = 5;
pub const FRAGMENT_TYPE_TRIGGER_PRIMITIVE: u32 = 6;
pub const FRAGMENT_TYPE_TRIGGER_ACTIVITY: u32 = 7;
pub const FRAGMENT_TYPE_TRIGGER_CANDIDATE: u32 = 8;
pub const FRAGMENT_TYPE_WIB_ETH: u32 = 12;

// Trigger primitive layouts
pub const LEGACY_TP_SIZE: usize = 48;
pub const PACKED_TP_SIZE: usize = 32;

// WIB frame layouts
pub const CHANNELS_PER_LINK: usize = 256;
pub const PROTO_WIB_FRAME_SIZE: usize = 464;
pub const PROTO_WIB_HEADER_SIZE: usize = 16;
pub const PROTO_WIB_BLOCKS: usize = 4;
pub const PROTO_WIB_BLOCK_HEADER_SIZE: usize = 16;
pub const PROTO_WIB_BLOCK_CHANNELS: usize = 64;
pub const PROTO_WIB_ADC_BITS: usize = 12;
pub const WIB_FRAME_SIZE: usize = 472;
pub const WIB_HEADER_SIZE: usize = 16;
pub const WIB_ADC_BITS: usize = 14;
pub const WIB_ETH_FRAME_SIZE: usize = 7200;
pub const WIB_ETH_HEADER_SIZE: usize = 32;
pub const WIB_ETH_CHANNELS: usize = 64;
pub const WIB_ETH_TICKS: usize = 64;
/// Timestamp clock ticks between two consecutive ADC samples
pub const TICKS_PER_SAMPLE: u64 = 32;

/// The DAQ timestamp clock runs at 62.5 MHz
pub const NS_PER_TIMESTAMP_TICK: u64 = 16;
