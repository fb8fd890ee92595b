use fxhash::FxHashSet;
use std::collections::BTreeSet;

use super::config::Config;
use super::container::{open_container, DaqFile, RecordId};
use super::decoder::{decode_adc_fragment, decode_tp_fragment};
use super::error::ProcessorError;
use super::fragment::{Fragment, FragmentType, SourceId};
use super::plane_sort::{sort_by_plane, UnresolvedPolicy};
use super::plot::{
    plot_adc_heatmap, plot_animation, plot_plane_scatter, plot_validation, prepare_out_directory,
    PlotMode,
};
use super::table::{AdcRecord, TpTable};
use super::wib_frame::FrontEnd;

/// Read a fragment, logging its header and whether it holds trigger primitives.
/// Returns None for fragments of a known non-TP type.
fn read_tp_fragment(file: &DaqFile, path: &str) -> Result<Option<Fragment>, ProcessorError> {
    let fragment = file.fragment(path)?;
    fragment.log_header(path);
    let fragment_type = fragment.header().fragment_type();
    if fragment_type.is_known_non_tp() {
        log::debug!("Skipping {path}, fragment type {fragment_type} holds no trigger primitives");
        return Ok(None);
    }
    Ok(Some(fragment))
}

/// Decode the trigger primitives of every selected record and produce the requested plots.
///
/// Fragments of a record are concatenated in path order. Returns one table per record.
pub fn process_tp_stream(
    config: &Config,
    mut progress: impl FnMut(usize, usize),
) -> Result<Vec<TpTable>, ProcessorError> {
    let (file, map, records) = open_container(
        &config.input_path,
        &config.record_selection(),
        &config.channel_map_source(),
    )?;

    let mut tables: Vec<TpTable> = Vec::with_capacity(records.len());
    for (idx, record) in records.iter().enumerate() {
        let mut table = TpTable::new(record.clone());
        for path in file.fragment_paths(record)? {
            if let Some(fragment) = read_tp_fragment(&file, &path)? {
                table.append(decode_tp_fragment(&fragment, config.tp_format, &map)?);
            }
        }
        log::info!("{record}: {} trigger primitives", table.len());
        if !table.unresolved_channels.is_empty() {
            log::warn!(
                "{record}: {} trigger primitives have no plane",
                table.unresolved_channels.len()
            );
        }

        if config.write_csv {
            prepare_out_directory(&config.out_directory)?;
            table.write_csv(&config.get_tp_csv_path(record))?;
        }
        tables.push(table);
        progress(idx + 1, records.len());
    }

    match config.plot {
        Some(PlotMode::Validation) => {
            plot_validation(&TpTable::concat(&tables), &config.out_directory)?
        }
        Some(PlotMode::Gif) => plot_animation(&tables, &config.out_directory)?,
        Some(PlotMode::Scatter) if config.all_records => {
            log::warn!("Scatter plots need an explicit record range, skipping")
        }
        Some(PlotMode::Scatter) => match tables.first() {
            Some(first) => {
                let partition = sort_by_plane(&first.rows, config.unresolved);
                log::info!(
                    "{} of {} trigger primitives assigned to a plane",
                    partition.n_resolved(),
                    first.len()
                );
                if config.unresolved == UnresolvedPolicy::Retain {
                    log::info!(
                        "{} trigger primitives with no plane were kept aside",
                        partition.unresolved.len()
                    );
                }
                plot_plane_scatter(&partition, &config.out_directory)?;
            }
            None => log::warn!("No records selected, skipping scatter plots"),
        },
        None => (),
    }

    Ok(tables)
}

/// Find the first fragment of a record holding raw front-end frames
fn find_raw_fragment(
    file: &DaqFile,
    record: &RecordId,
    front_end: Option<FrontEnd>,
) -> Result<Option<Fragment>, ProcessorError> {
    for path in file.fragment_paths(record)? {
        let fragment = file.fragment(&path)?;
        fragment.log_header(&path);
        let fragment_type = fragment.header().fragment_type();
        let is_raw = match front_end {
            Some(_) => !fragment_type.is_trigger_primitive()
                && !matches!(
                    fragment_type,
                    FragmentType::TriggerActivity | FragmentType::TriggerCandidate
                ),
            None => FrontEnd::infer(fragment_type).is_ok(),
        };
        if is_raw {
            return Ok(Some(fragment));
        }
    }
    Ok(None)
}

/// Decode the raw ADC data of the first raw fragment in every selected record.
///
/// Writes the channel-by-time table and the event display of each record to the output
/// directory.
pub fn process_trigger_records(
    config: &Config,
    mut progress: impl FnMut(usize, usize),
) -> Result<Vec<AdcRecord>, ProcessorError> {
    let (file, map, records) = open_container(
        &config.input_path,
        &config.record_selection(),
        &config.channel_map_source(),
    )?;

    let mut adc_records = Vec::with_capacity(records.len());
    for (idx, record) in records.iter().enumerate() {
        progress(idx + 1, records.len());
        let Some(fragment) = find_raw_fragment(&file, record, config.front_end)? else {
            log::warn!("{record} has no raw data fragment, skipping");
            continue;
        };
        let mut adc = decode_adc_fragment(&fragment, config.front_end, &map)?;
        adc.record = Some(record.clone());
        log::info!(
            "{record}: {} ticks x {} channels from {}",
            adc.n_ticks(),
            adc.n_channels(),
            adc.address
        );

        prepare_out_directory(&config.out_directory)?;
        adc.write_csv(&config.get_adc_csv_path(record))?;
        plot_adc_heatmap(&adc, &config.get_event_display_path(record))?;
        adc_records.push(adc);
    }
    Ok(adc_records)
}

/// The readout elements feeding one trigger primitive fragment
#[derive(Debug, Clone, PartialEq)]
pub struct SourceReport {
    pub record: RecordId,
    pub path: String,
    pub source_id: SourceId,
    pub n_channels: usize,
    pub elements: BTreeSet<String>,
}

/// Report which detector elements (APAs/CRPs) the channels of each trigger primitive
/// fragment belong to.
pub fn check_tp_sources(
    config: &Config,
    mut progress: impl FnMut(usize, usize),
) -> Result<Vec<SourceReport>, ProcessorError> {
    let (file, map, records) = open_container(
        &config.input_path,
        &config.record_selection(),
        &config.channel_map_source(),
    )?;

    let mut reports = Vec::new();
    for (idx, record) in records.iter().enumerate() {
        log::info!("record id: {record}");
        for path in file.fragment_paths(record)? {
            let Some(fragment) = read_tp_fragment(&file, &path)? else {
                continue;
            };
            let table = decode_tp_fragment(&fragment, config.tp_format, &map)?;

            let channels: FxHashSet<u32> = table.rows.iter().map(|row| row.channel).collect();
            let elements: BTreeSet<String> = channels
                .iter()
                .filter_map(|channel| map.element_name(channel))
                .map(String::from)
                .collect();

            let source_id = fragment.header().element_id;
            log::info!("TP input source ID: {source_id}");
            log::info!("Element names: {elements:?}");
            reports.push(SourceReport {
                record: record.clone(),
                path,
                source_id,
                n_channels: channels.len(),
                elements,
            });
        }
        progress(idx + 1, records.len());
    }
    Ok(reports)
}
