use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::channel_map::{ChannelMapScheme, ChannelMapSource};
use super::container::RecordId;
use super::error::ConfigError;
use super::plane_sort::UnresolvedPolicy;
use super::plot::PlotMode;
use super::record_selector::RecordSelection;
use super::trigger_primitive::TpFormat;
use super::wib_frame::FrontEnd;

/// Structure representing the application configuration. Contains pathing and record selection
/// Configs are seralizable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub input_path: PathBuf,
    pub records: String,
    pub all_records: bool,
    pub out_directory: PathBuf,
    pub channel_map: ChannelMapScheme,
    pub channel_map_path: Option<PathBuf>,
    pub front_end: Option<FrontEnd>,
    pub tp_format: TpFormat,
    pub plot: Option<PlotMode>,
    pub write_csv: bool,
    pub unresolved: UnresolvedPolicy,
    pub debug: bool,
}

impl Default for Config {
    /// Generate a new Config object. The input path is empty/invalid
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("None"),
            records: String::from("0"),
            all_records: false,
            out_directory: PathBuf::from("plot"),
            channel_map: ChannelMapScheme::default(),
            channel_map_path: None,
            front_end: None,
            tp_format: TpFormat::default(),
            plot: None,
            write_csv: false,
            unresolved: UnresolvedPolicy::default(),
            debug: false,
        }
    }
}

impl Config {
    /// Read the configuration in a YAML file
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    /// Write the configuration to a YAML file
    pub fn write_config_file(&self, config_path: &Path) -> Result<(), ConfigError> {
        let yaml_str = serde_yaml::to_string(self)?;
        std::fs::write(config_path, yaml_str)?;
        Ok(())
    }

    pub fn record_selection(&self) -> RecordSelection {
        if self.all_records {
            RecordSelection::All
        } else {
            RecordSelection::Range(self.records.clone())
        }
    }

    /// A custom map file takes precedence over the named scheme
    pub fn channel_map_source(&self) -> ChannelMapSource {
        match &self.channel_map_path {
            Some(path) => ChannelMapSource::File(path.clone()),
            None => ChannelMapSource::Scheme(self.channel_map),
        }
    }

    pub fn does_input_exist(&self) -> bool {
        self.input_path.exists()
    }

    /// Get the path to the raw data table of a record
    pub fn get_adc_csv_path(&self, record: &RecordId) -> PathBuf {
        self.out_directory.join(format!("tr_{}.csv", record.file_label()))
    }

    /// Get the path to the trigger primitive table of a record
    pub fn get_tp_csv_path(&self, record: &RecordId) -> PathBuf {
        self.out_directory.join(format!("tp_{}.csv", record.file_label()))
    }

    /// Get the path to the event display of a record
    pub fn get_event_display_path(&self, record: &RecordId) -> PathBuf {
        self.out_directory.join(format!("evd_tr_{}.png", record.file_label()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        let config = Config {
            input_path: PathBuf::from("/data/run.hdf5"),
            records: String::from("0-3"),
            front_end: Some(FrontEnd::WibEth),
            tp_format: TpFormat::Packed,
            plot: Some(PlotMode::Scatter),
            unresolved: UnresolvedPolicy::Retain,
            ..Default::default()
        };
        config.write_config_file(&path).unwrap();
        assert_eq!(Config::read_config_file(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        std::fs::write(&path, "input_path: run.hdf5\nchannel_map: PD2HD\nplot: gif\n").unwrap();
        let config = Config::read_config_file(&path).unwrap();
        assert_eq!(config.channel_map, ChannelMapScheme::PD2HD);
        assert_eq!(config.plot, Some(PlotMode::Gif));
        assert_eq!(config.records, "0");
        assert_eq!(config.out_directory, PathBuf::from("plot"));
    }

    #[test]
    fn test_missing_config() {
        assert!(matches!(
            Config::read_config_file(Path::new("/no/such/config.yml")),
            Err(ConfigError::BadFilePath(_))
        ));
    }

    #[test]
    fn test_sources() {
        let mut config = Config::default();
        assert_eq!(config.record_selection(), RecordSelection::Range(String::from("0")));
        assert_eq!(
            config.channel_map_source(),
            ChannelMapSource::Scheme(ChannelMapScheme::VDColdbox)
        );

        config.all_records = true;
        config.channel_map_path = Some(PathBuf::from("map.csv"));
        assert_eq!(config.record_selection(), RecordSelection::All);
        assert_eq!(
            config.channel_map_source(),
            ChannelMapSource::File(PathBuf::from("map.csv"))
        );

        let record = RecordId::parse("TriggerRecord00004.0000").unwrap();
        assert_eq!(config.get_adc_csv_path(&record), PathBuf::from("plot/tr_4.csv"));
        assert_eq!(
            config.get_event_display_path(&record),
            PathBuf::from("plot/evd_tr_4.png")
        );
    }

    #[test]
    fn test_sequences_get_their_own_outputs() {
        let config = Config::default();
        let first = RecordId::parse("TriggerRecord00001.0000").unwrap();
        let second = RecordId::parse("TriggerRecord00001.0001").unwrap();
        assert_ne!(config.get_adc_csv_path(&first), config.get_adc_csv_path(&second));
        assert_ne!(config.get_tp_csv_path(&first), config.get_tp_csv_path(&second));
        assert_ne!(
            config.get_event_display_path(&first),
            config.get_event_display_path(&second)
        );
        assert_eq!(
            config.get_adc_csv_path(&second),
            PathBuf::from("plot/tr_1.0001.csv")
        );
    }
}
