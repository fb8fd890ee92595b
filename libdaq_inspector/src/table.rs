use ndarray::{Array2, Axis};
use serde::{Serialize, Serializer};
use std::path::Path;

use super::container::RecordId;
use super::error::PlotError;
use super::fragment::SourceId;
use super::hardware_id::{plane_id_or_sentinel, LinkAddress, Plane};
use super::plane_sort::PlaneTagged;
use super::trigger_primitive::TriggerPrimitive;
use super::wib_frame::FrontEnd;

fn serialize_plane<S: Serializer>(plane: &Option<Plane>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_i8(plane_id_or_sentinel(*plane))
}

/// One decoded trigger primitive with its plane resolved through the channel map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TpRow {
    pub time_start: u64,
    pub time_peak: u64,
    pub time_over_threshold: u64,
    pub channel: u32,
    pub adc_integral: u32,
    pub adc_peak: u16,
    pub det_id: u16,
    #[serde(serialize_with = "serialize_plane")]
    pub plane: Option<Plane>,
}

impl TpRow {
    pub fn new(tp: &TriggerPrimitive, plane: Option<Plane>) -> Self {
        Self {
            time_start: tp.time_start,
            time_peak: tp.time_peak,
            time_over_threshold: tp.time_over_threshold,
            channel: tp.channel,
            adc_integral: tp.adc_integral,
            adc_peak: tp.adc_peak,
            det_id: tp.det_id,
            plane,
        }
    }
}

impl PlaneTagged for TpRow {
    fn plane(&self) -> Option<Plane> {
        self.plane
    }
}

/// The named numeric columns of a TpRow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TpColumn {
    TimeStart,
    TimePeak,
    TimeOverThreshold,
    Channel,
    AdcIntegral,
    AdcPeak,
    DetId,
    Plane,
}

impl TpColumn {
    pub const ALL: [TpColumn; 8] = [
        Self::TimeStart,
        Self::TimePeak,
        Self::TimeOverThreshold,
        Self::Channel,
        Self::AdcIntegral,
        Self::AdcPeak,
        Self::DetId,
        Self::Plane,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::TimeStart => "time_start",
            Self::TimePeak => "time_peak",
            Self::TimeOverThreshold => "time_over_threshold",
            Self::Channel => "channel",
            Self::AdcIntegral => "adc_integral",
            Self::AdcPeak => "adc_peak",
            Self::DetId => "det_id",
            Self::Plane => "plane",
        }
    }

    pub fn value(&self, row: &TpRow) -> f64 {
        match self {
            Self::TimeStart => row.time_start as f64,
            Self::TimePeak => row.time_peak as f64,
            Self::TimeOverThreshold => row.time_over_threshold as f64,
            Self::Channel => row.channel as f64,
            Self::AdcIntegral => row.adc_integral as f64,
            Self::AdcPeak => row.adc_peak as f64,
            Self::DetId => row.det_id as f64,
            Self::Plane => plane_id_or_sentinel(row.plane) as f64,
        }
    }

    pub fn values(&self, rows: &[TpRow]) -> Vec<f64> {
        rows.iter().map(|row| self.value(row)).collect()
    }
}

/// The decoded trigger primitives of one record (or one fragment), in on-disk order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TpTable {
    pub record: Option<RecordId>,
    pub source_id: Option<SourceId>,
    pub rows: Vec<TpRow>,
    /// Channels which could not be resolved to a plane, once per affected row
    pub unresolved_channels: Vec<u32>,
}

impl TpTable {
    pub fn new(record: RecordId) -> Self {
        Self {
            record: Some(record),
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append the rows of another table, keeping their order
    pub fn append(&mut self, mut other: TpTable) {
        self.rows.append(&mut other.rows);
        self.unresolved_channels
            .append(&mut other.unresolved_channels);
    }

    /// Concatenate the rows of several tables
    pub fn concat(tables: &[TpTable]) -> Vec<TpRow> {
        tables.iter().flat_map(|t| t.rows.iter().copied()).collect()
    }

    pub fn write_csv(&self, path: &Path) -> Result<(), PlotError> {
        let mut writer = csv::Writer::from_path(path)?;
        for row in self.rows.iter() {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// The raw ADC content of one fragment: a (ticks x channels) matrix with the offline channel
/// and plane of every column and the timestamp of every row.
#[derive(Debug, Clone, PartialEq)]
pub struct AdcRecord {
    pub record: Option<RecordId>,
    pub front_end: FrontEnd,
    pub address: LinkAddress,
    pub channels: Vec<Option<u32>>,
    pub planes: Vec<Option<Plane>>,
    pub timestamps: Vec<u64>,
    pub adc: Array2<u16>,
}

impl AdcRecord {
    pub fn n_ticks(&self) -> usize {
        self.adc.nrows()
    }

    pub fn n_channels(&self) -> usize {
        self.adc.ncols()
    }

    /// ADC counts with the mean of every channel removed
    pub fn pedestal_subtracted(&self) -> Array2<f64> {
        let adc = self.adc.mapv(|v| v as f64);
        match adc.mean_axis(Axis(0)) {
            Some(mean) => adc - &mean,
            None => adc,
        }
    }

    /// Write the channel-by-time table: a header of offline channels, a row of planes, then
    /// one row of ADC counts per tick keyed by its timestamp.
    pub fn write_csv(&self, path: &Path) -> Result<(), PlotError> {
        let mut writer = csv::Writer::from_path(path)?;

        let mut header = vec![String::new()];
        header.extend(self.channels.iter().map(|c| match c {
            Some(channel) => channel.to_string(),
            None => String::from("unknown"),
        }));
        writer.write_record(&header)?;

        let mut planes = vec![String::from("plane")];
        planes.extend(
            self.planes
                .iter()
                .map(|p| plane_id_or_sentinel(*p).to_string()),
        );
        writer.write_record(&planes)?;

        for (timestamp, row) in self.timestamps.iter().zip(self.adc.outer_iter()) {
            let mut record = vec![timestamp.to_string()];
            record.extend(row.iter().map(|v| v.to_string()));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}
