use clap::{Arg, ArgAction, ArgMatches, Command};
use indicatif::{MultiProgress, ProgressBar};
use indicatif_log_bridge::LogWrapper;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use libdaq_inspector::channel_map::ChannelMapScheme;
use libdaq_inspector::config::Config;
use libdaq_inspector::error::{ContainerError, ProcessorError};
use libdaq_inspector::plot::PlotMode;
use libdaq_inspector::process::{check_tp_sources, process_tp_stream, process_trigger_records};
use libdaq_inspector::trigger_primitive::TpFormat;
use libdaq_inspector::wib_frame::FrontEnd;

/// Options shared by every analysis subcommand
fn common_args(command: Command) -> Command {
    command
        .arg(Arg::new("file").help("DAQ HDF5 file to open"))
        .arg(
            Arg::new("records")
                .short('r')
                .long("records")
                .help("Records to study, e.g. 0,2-5,9 [default: 0]"),
        )
        .arg(
            Arg::new("all")
                .short('a')
                .long("all")
                .action(ArgAction::SetTrue)
                .help("Study every record in the file"),
        )
        .arg(
            Arg::new("out-directory")
                .short('o')
                .long("out-directory")
                .help("Output directory for plots and tables [default: plot]"),
        )
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .action(ArgAction::SetTrue)
                .help("Log fragment headers and every decoded item"),
        )
        .arg(
            Arg::new("channel-map")
                .short('c')
                .long("channel-map")
                .value_parser(ChannelMapScheme::ALL.map(|scheme| scheme.name()))
                .help("Named channel map scheme"),
        )
        .arg(
            Arg::new("channel-map-file")
                .short('m')
                .long("channel-map-file")
                .help("CSV channel map, overrides --channel-map"),
        )
        .arg(
            Arg::new("tp-format")
                .short('t')
                .long("tp-format")
                .value_parser(TpFormat::NAMES)
                .help("Trigger primitive layout"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("YAML configuration file; command line options take precedence"),
        )
}

fn value<'a>(matches: &'a ArgMatches, id: &str) -> Option<&'a String> {
    matches.try_get_one::<String>(id).ok().flatten()
}

fn flag(matches: &ArgMatches, id: &str) -> bool {
    matches
        .try_get_one::<bool>(id)
        .ok()
        .flatten()
        .copied()
        .unwrap_or(false)
}

/// Merge the command line over the (optional) configuration file
fn build_config(matches: &ArgMatches) -> Result<Config, ProcessorError> {
    let mut config = match value(matches, "config") {
        Some(path) => {
            log::info!("Loading config from {path}...");
            Config::read_config_file(Path::new(path))?
        }
        None => Config::default(),
    };

    if let Some(file) = value(matches, "file") {
        config.input_path = PathBuf::from(file);
    }
    if let Some(records) = value(matches, "records") {
        config.records = records.clone();
    }
    if let Some(out) = value(matches, "out-directory") {
        config.out_directory = PathBuf::from(out);
    }
    if let Some(name) = value(matches, "channel-map") {
        config.channel_map = ChannelMapScheme::from_str(name)?;
    }
    if let Some(path) = value(matches, "channel-map-file") {
        config.channel_map_path = Some(PathBuf::from(path));
    }
    if let Some(Ok(format)) = value(matches, "tp-format").map(|s| TpFormat::from_str(s)) {
        config.tp_format = format;
    }
    if let Some(Ok(mode)) = value(matches, "plot").map(|s| PlotMode::from_str(s)) {
        config.plot = Some(mode);
    }
    if let Some(Ok(front_end)) = value(matches, "front-end").map(|s| FrontEnd::from_str(s)) {
        config.front_end = Some(front_end);
    }
    config.all_records |= flag(matches, "all");
    config.write_csv |= flag(matches, "csv");
    config.debug |= flag(matches, "debug");
    Ok(config)
}

fn log_config(config: &Config) {
    log::info!("Input file: {}", config.input_path.to_string_lossy());
    if config.all_records {
        log::info!("Records: all");
    } else {
        log::info!("Records: {}", config.records);
    }
    match &config.channel_map_path {
        Some(path) => log::info!("Channel map file: {}", path.to_string_lossy()),
        None => log::info!("Channel map: {}", config.channel_map),
    }
    log::info!("Output directory: {}", config.out_directory.to_string_lossy());
}

fn run(
    command: &str,
    matches: &ArgMatches,
    pb_manager: &MultiProgress,
) -> Result<(), ProcessorError> {
    if command == "new" {
        let path = value(matches, "path").map(PathBuf::from).unwrap_or_default();
        log::info!("Making a template config at {}...", path.to_string_lossy());
        Config::default().write_config_file(&path)?;
        return Ok(());
    }

    let config = build_config(matches)?;
    if config.debug {
        log::set_max_level(log::LevelFilter::Debug);
    }
    log_config(&config);
    if !config.does_input_exist() {
        return Err(ContainerError::BadFilePath(config.input_path.clone()).into());
    }

    let pb = pb_manager.add(ProgressBar::new(0));
    let progress = |done: usize, total: usize| {
        pb.set_length(total as u64);
        pb.set_position(done as u64);
    };

    match command {
        "tp" => {
            let tables = process_tp_stream(&config, progress)?;
            let n_tps: usize = tables.iter().map(|t| t.len()).sum();
            log::info!("Decoded {n_tps} trigger primitives from {} records", tables.len());
        }
        "raw" => {
            let records = process_trigger_records(&config, progress)?;
            log::info!("Decoded raw data of {} records", records.len());
        }
        "sources" => {
            let reports = check_tp_sources(&config, progress)?;
            log::info!("Checked {} trigger primitive fragments", reports.len());
        }
        _ => (),
    }
    pb.finish();
    Ok(())
}

fn main() {
    // Create a cli
    let matches = Command::new("daq_inspector_cli")
        .about("Inspect trigger primitive and raw data in DAQ HDF5 files")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            common_args(Command::new("tp").about("Decode and plot trigger primitives"))
                .arg(
                    Arg::new("plot")
                        .short('p')
                        .long("plot")
                        .value_parser(PlotMode::NAMES)
                        .help("Plots to make of the trigger primitives"),
                )
                .arg(
                    Arg::new("csv")
                        .long("csv")
                        .action(ArgAction::SetTrue)
                        .help("Write a table of trigger primitives per record"),
                ),
        )
        .subcommand(
            common_args(
                Command::new("raw").about("Decode raw WIB data into tables and event displays"),
            )
            .arg(
                Arg::new("front-end")
                    .short('f')
                    .long("front-end")
                    .value_parser(FrontEnd::NAMES)
                    .help("Front-end frame layout; inferred from the fragment type if absent"),
            ),
        )
        .subcommand(common_args(
            Command::new("sources").about("Report the detector elements feeding each TP fragment"),
        ))
        .subcommand(
            Command::new("new")
                .about("Make a template configuration yaml file")
                .arg(Arg::new("path").required(true).help("Path to the file")),
        )
        .get_matches();

    let Some((command, sub_matches)) = matches.subcommand() else {
        return;
    };

    // Initialize feedback
    let level = if flag(sub_matches, "debug") {
        simplelog::LevelFilter::Debug
    } else {
        simplelog::LevelFilter::Info
    };
    let logger = simplelog::TermLogger::new(
        simplelog::LevelFilter::Debug,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );

    let pb_manager = MultiProgress::new();

    if let Err(e) = LogWrapper::new(pb_manager.clone(), logger).try_init() {
        eprintln!("Could not create logging/progress: {e}");
        std::process::exit(1);
    }
    log::set_max_level(level);

    match run(command, sub_matches, &pb_manager) {
        Ok(()) => log::info!("Done."),
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    }
}
