use std::fs;
use std::fs::File;
use std::io::IsTerminal;
use std::io::Write;

use allocator_api2::alloc::Allocator;
use anyhow::{anyhow, Context};
use clap::Parser;
use inferno::flamegraph;
use tracing::{debug, info, Level};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::FmtSubscriber;

use flamecache::labels::LabelSet;
use flamecache::region::Region;
use flamecache::window::{AggregationWindow, FlushedTree, IngestError, WindowConfig};

mod args;
mod folded;
mod validators;

use crate::args::CliArgs;
use crate::args::LoggingLevel;
use crate::args::ProfileFormat;
use crate::folded::parse_folded_line;

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    let level_filter = match args.logging {
        LoggingLevel::Trace => Level::TRACE,
        LoggingLevel::Debug => Level::DEBUG,
        LoggingLevel::Info => Level::INFO,
        LoggingLevel::Warn => Level::WARN,
        LoggingLevel::Error => Level::ERROR,
    };

    // The profile may go to stdout.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level_filter)
        .with_span_events(FmtSpan::ENTER | FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let config = WindowConfig {
        dropped_label_keys: args.dropped_labels.clone(),
    };
    let labels: LabelSet = args.labels.iter().cloned().collect();

    let folded = match args.region_capacity_bytes {
        None => {
            let mut window = AggregationWindow::new(config);
            aggregate(&mut window, &args, &labels)?;
            collapse(window.flush())
        }
        Some(bytes) => {
            let region = Region::with_capacity(bytes)?;
            let mut window = AggregationWindow::in_region(&region, config);
            aggregate(&mut window, &args, &labels)?;
            let folded = collapse(window.flush());
            debug!(
                "region capacity {} bytes, {} requested",
                region.capacity().unwrap_or(bytes),
                bytes
            );
            folded
        }
    };

    let writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout().lock()),
    };
    write_profile(&folded, &args.profile_format, writer)?;

    if let Some(path) = &args.output {
        eprintln!("Profile successfully written to {}", path.display());
    }
    Ok(())
}

/// Feeds every input line into `window`. All samples share one series, so
/// its labels and hash are computed once.
fn aggregate<A: Allocator + Clone>(
    window: &mut AggregationWindow<A>,
    args: &CliArgs,
    labels: &LabelSet,
) -> anyhow::Result<()> {
    let series = window.series_labels(labels).into_owned();
    let hash = series.hash();

    for path in &args.inputs {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        for (i, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let (stack, weight) = parse_folded_line(line)
                .with_context(|| format!("{}:{}", path.display(), i + 1))?;

            match window.ingest_with_hash(args.sample_type, &series, hash, &stack, weight) {
                Ok(()) => {}
                // Logged by the window. The region is full, keep what fits.
                Err(IngestError::Insert(_)) => {}
                Err(err) => return Err(err.into()),
            }
        }
    }

    info!("aggregated {} with labels {}", window.stats(), series);
    Ok(())
}

fn collapse<A: Allocator>(flushed: Vec<FlushedTree<A>>) -> String {
    flushed
        .iter()
        .map(|series| series.tree.fold())
        .filter(|folded| !folded.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn write_profile(
    folded: &str,
    format: &ProfileFormat,
    mut writer: Box<dyn Write>,
) -> anyhow::Result<()> {
    match format {
        ProfileFormat::Folded => {
            if !folded.is_empty() {
                writeln!(writer, "{folded}")?;
            }
            writer.flush()?;
        }
        ProfileFormat::FlameGraph => {
            let mut options: flamegraph::Options<'_> = flamegraph::Options::default();
            flamegraph::from_reader(&mut options, folded.as_bytes(), writer)
                .map_err(|e| anyhow!("failed to generate flamegraph: {:?}", e))?;
        }
    }
    Ok(())
}
