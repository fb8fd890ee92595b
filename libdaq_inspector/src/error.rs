use std::path::PathBuf;
use thiserror::Error;

use super::constants::{FRAGMENT_HEADER_MARKER, FRAGMENT_HEADER_SIZE};

#[derive(Debug, Error)]
pub enum RangeError {
    #[error("Failed to parse record range token '{token}': {source}")]
    BadToken {
        token: String,
        source: std::num::ParseIntError,
    },
    #[error("Record index {index} is out of range; only {count} records are available")]
    OutOfRange { index: usize, count: usize },
}

#[derive(Debug, Error)]
pub enum ChannelMapError {
    #[error("ChannelMap failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("ChannelMap failed to parse an integer: {0}")]
    ParsingError(#[from] std::num::ParseIntError),
    #[error("ChannelMap was given a file with the incorrect format; most likely the number of columns is incorrect")]
    BadFileFormat,
    #[error("Unrecognized channel map scheme: {0}")]
    UnknownScheme(String),
    #[error("Invalid plane id {0} found in channel map; expected 0, 1 or 2")]
    BadPlane(u8),
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Failed to parse buffer into an item: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Item buffer has {0} bytes; expected {1}")]
    BadItemSize(usize, usize),
    #[error("Failed to shape ADC values into a frame: {0}")]
    ShapeError(#[from] ndarray::ShapeError),
}

#[derive(Debug, Error)]
pub enum FragmentError {
    #[error("Failed to parse fragment header: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Fragment buffer of {0} bytes is smaller than the fragment header ({size} bytes)", size=FRAGMENT_HEADER_SIZE)]
    TooShort(usize),
    #[error("Incorrect fragment header marker {0:#x}; expected {exp:#x}", exp=FRAGMENT_HEADER_MARKER)]
    BadMarker(u32),
    #[error("Fragment header claims {0} bytes but the buffer holds {1} bytes")]
    SizeMismatch(u64, usize),
    #[error("Failed to decode an item of the fragment: {0}")]
    BadItem(#[from] FrameError),
}

#[derive(Debug, Error)]
pub enum FrontEndError {
    #[error("Unrecognized front-end type: {0}")]
    Unknown(String),
    #[error("Could not infer a front-end type from fragment type code {0}")]
    NotInferable(u32),
}

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("Container failed due to HDF5 error: {0}")]
    HDF5Error(#[from] hdf5::Error),
    #[error("Could not open container because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Record index {0} is out of range; the container holds {1} records")]
    RecordOutOfRange(usize, usize),
    #[error("Container failed due to record range error: {0}")]
    RangeError(#[from] RangeError),
    #[error("Container failed due to ChannelMap error: {0}")]
    MapError(#[from] ChannelMapError),
    #[error("Container failed due to Fragment error: {0}")]
    FragmentError(#[from] FragmentError),
}

#[derive(Debug, Error)]
pub enum DecoderError {
    #[error("Decoder failed due to Fragment error: {0}")]
    FragmentError(#[from] FragmentError),
    #[error("Decoder failed due to front-end error: {0}")]
    FrontEndError(#[from] FrontEndError),
    #[error("Decoder found no complete frames in the fragment")]
    NoFrames,
    #[error("Decoder failed to stack frames: {0}")]
    ShapeError(#[from] ndarray::ShapeError),
}

#[derive(Debug, Error)]
pub enum PlotError {
    #[error("Plotting failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Plotting failed while drawing: {0}")]
    DrawingError(String),
    #[error("Plotting failed to write CSV: {0}")]
    CsvError(#[from] csv::Error),
}

impl<E> From<plotters::drawing::DrawingAreaErrorKind<E>> for PlotError
where
    E: std::error::Error + Send + Sync,
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        Self::DrawingError(value.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Processor failed due to Container error: {0}")]
    ContainerError(#[from] ContainerError),
    #[error("Processor failed due to Decoder error: {0}")]
    DecoderError(#[from] DecoderError),
    #[error("Processor failed due to Plot error: {0}")]
    PlotError(#[from] PlotError),
    #[error("Processor failed due to Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Processor failed due to ChannelMap error: {0}")]
    MapError(#[from] ChannelMapError),
    #[error("Processor failed due to IO error: {0}")]
    IoError(#[from] std::io::Error),
}
