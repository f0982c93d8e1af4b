use clap::Parser;
use std::path::PathBuf;

use flamecache::cache::SampleType;
use flamecache::labels::Label;

use crate::validators::parse_label;
use crate::validators::parse_region_capacity;

#[derive(clap::ValueEnum, Debug, Clone, Default)]
pub(crate) enum LoggingLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

#[derive(PartialEq, clap::ValueEnum, Debug, Clone, Default)]
pub(crate) enum ProfileFormat {
    /// One `frame;frame;frame weight` line per distinct stack
    #[default]
    Folded,
    FlameGraph,
}

#[derive(Parser, Debug)]
#[command(about = "Aggregate collapsed stacks into a call tree")]
pub(crate) struct CliArgs {
    /// Files with collapsed stacks, one `frame;frame;frame weight` per line
    #[arg(required = true, value_name = "PATH")]
    pub(crate) inputs: Vec<PathBuf>,
    /// Sample type the stacks are recorded under
    #[arg(long, default_value_t = 0)]
    pub(crate) sample_type: SampleType,
    /// Label attached to every sample, as `key=value`. Integer values are
    /// stored as numbers
    #[arg(long = "label", value_name = "KEY=VALUE", value_parser = parse_label)]
    pub(crate) labels: Vec<Label>,
    /// Label key left out of the series identity
    #[arg(long = "drop-label", value_name = "KEY")]
    pub(crate) dropped_labels: Vec<String>,
    /// Build the trees in a fixed-size region of this many bytes. Samples
    /// that don't fit are dropped
    #[arg(long, value_parser = parse_region_capacity)]
    pub(crate) region_capacity_bytes: Option<usize>,
    #[arg(long, default_value_t, value_enum)]
    pub(crate) profile_format: ProfileFormat,
    /// Where to write the profile. Defaults to stdout
    #[arg(long, short)]
    pub(crate) output: Option<PathBuf>,
    /// Set flamecache's logging level
    #[arg(long, default_value_t, value_enum)]
    pub(crate) logging: LoggingLevel,
}
