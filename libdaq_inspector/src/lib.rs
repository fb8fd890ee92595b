//! # daq_inspector
//!
//! daq_inspector is a set of analysis utilities for data recorded by the DUNE style data
//! acquisition, written in Rust. It opens the HDF5 containers written by the DAQ, decodes the
//! trigger primitive and raw WIB fragments of selected records, resolves every channel to its
//! wire plane and detector element through a channel map, and renders validation plots and
//! CSV tables of the result.
//!
//! ## Installation
//!
//! The only method of install is from source.
//!
//! ### HDF5
//!
//! HDF5 must be installed before building. Typically this will be installed using a package
//! manager (homebrew, apt, etc), and the Rust libraries will auto detect the location of the
//! HDF install. If HDF5 lives in a custom location, write the following snippet into the file
//! `.cargo/config.toml` in the repository:
//!
//! ```toml
//! [env]
//! HDF5_DIR="/path/to/my/hdf5/install/"
//!
//! [build]
//! rustflags="-C link-args=-Wl,-rpath,/path/to/my/hdf5/install/lib"
//! ```
//!
//! ### Building & Install
//!
//! To build and install the CLI use `cargo install --path ./daq_inspector_cli` from the top
//! level repository.
//!
//! ## Usage
//!
//! ```text
//! daq_inspector_cli tp run.hdf5 -r 0-4 -p validation -c PD2HDChannelMap
//! daq_inspector_cli raw run.hdf5 -r 0 -f wib_eth -o evd
//! daq_inspector_cli sources run.hdf5 -a
//! daq_inspector_cli new config.yml
//! ```
//!
//! Records are chosen with a range expression such as `0,2-5,9`: comma separated tokens, each a
//! single index or an inclusive `lo-hi` pair, counted in the order the records appear in the
//! file. An expression containing letters selects nothing.
//!
//! ## Configuration
//!
//! Every command line option can also be given through a YAML file (`--config`). A template
//! is written by the `new` subcommand:
//!
//! ```yml
//! input_path: None
//! records: '0'
//! all_records: false
//! out_directory: plot
//! channel_map: VDColdbox
//! channel_map_path: null
//! front_end: null
//! tp_format: legacy
//! plot: null
//! write_csv: false
//! unresolved: drop
//! debug: false
//! ```
//!
//! If `channel_map_path` is set it takes precedence over the named `channel_map` scheme.
//!
//! ### Channel Map Format
//!
//! A custom channel map is a CSV file with a header line followed by one line per channel:
//!
//! ```csv
//! crate,slot,link,channel,offline,plane,element
//! ```
//!
//! `plane` is 0 (u), 1 (v) or 2 (z); `element` is the name of the APA/CRP.
//!
//! ## Output
//!
//! - `tp -p validation`: `<out>/<column>.png` step histograms of every trigger primitive column
//! - `tp -p gif`: `<out>/anim.gif`, channel vs peak time, one frame per record
//! - `tp -p scatter`: `<out>/scatter_{u,v,z}.png` for the first selected record
//! - `tp --csv`: `<out>/tp_<record>.csv`
//! - `raw`: `<out>/tr_<record>.csv` and the event display `<out>/evd_tr_<record>.png`
//!
//! `<record>` is the record number, with the sequence number appended (`tr_1.0001.csv`) for
//! records split into several sequences.
pub mod channel_map;
pub mod config;
pub mod constants;
pub mod container;
pub mod decoder;
pub mod error;
pub mod fragment;
pub mod hardware_id;
pub mod histogram;
pub mod plane_sort;
pub mod plot;
pub mod process;
pub mod record_selector;
pub mod table;
pub mod trigger_primitive;
pub mod wib_frame;
