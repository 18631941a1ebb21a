use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use nanotick::column::external::{write_column_file, MmapBlockLoader};
use nanotick::column::{ExternalStorage, TimestampColumn, TimestampSource};
use nanotick::time::format::format_timestamp;
use nanotick::time::literal::{detect_literal_with_style, scan_quoted_literals};
use nanotick::time::parse::{parse_time_precision, parse_timestamp};
use nanotick::time::period::plus_period;
use nanotick::time::{plus, TimeLiteral};
use nanotick::{NanotickConfig, RowSet, SortOrder, TimeZone, Timestamp, TimestampRangeFilter};

#[derive(Parser)]
#[command(name = "nanotick", version, about = "Nanosecond timestamp tooling")]
struct Cli {
    /// JSON configuration file.
    #[arg(long = "config", global = true)]
    config: Option<PathBuf>,
    /// Zone for rendering; overrides the configured default.
    #[arg(long = "zone", global = true)]
    zone: Option<TimeZone>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a literal and print its canonical form.
    Detect { literal: String },
    /// List the quoted time literals in an expression.
    Scan { expression: String },
    /// Add a duration or period to a timestamp.
    Plus { timestamp: String, amount: String },
    /// Write timestamp literals (one per line, `null` for none) as a column file.
    Pack {
        input: PathBuf,
        output: PathBuf,
        #[arg(long = "block-shift")]
        block_shift: Option<u32>,
    },
    /// Count the rows of a column file within a time range.
    Filter {
        path: PathBuf,
        lower: String,
        upper: String,
        #[arg(long = "exclusive-lower")]
        exclusive_lower: bool,
        #[arg(long = "exclusive-upper")]
        exclusive_upper: bool,
        /// Values are ascending; use binary search.
        #[arg(long = "sorted")]
        sorted: bool,
    },
}

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => NanotickConfig::load(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => NanotickConfig::default(),
    };
    let zone = cli.zone.unwrap_or(config.default_zone);
    let mut out = BufWriter::new(io::stdout());
    match cli.command {
        Commands::Detect { literal } => cmd_detect(&literal, &config, zone, &mut out)?,
        Commands::Scan { expression } => cmd_scan(&expression, &config, zone, &mut out)?,
        Commands::Plus { timestamp, amount } => cmd_plus(&timestamp, &amount, zone, &mut out)?,
        Commands::Pack {
            input,
            output,
            block_shift,
        } => {
            let shift = block_shift.unwrap_or(config.external_block_shift);
            cmd_pack(&input, &output, shift, &mut out)?;
        }
        Commands::Filter {
            path,
            lower,
            upper,
            exclusive_lower,
            exclusive_upper,
            sorted,
        } => {
            let filter = TimestampRangeFilter::new(
                "Timestamp",
                parse_timestamp(&lower)?,
                parse_timestamp(&upper)?,
            )
            .with_inclusivity(!exclusive_lower, !exclusive_upper)
            .with_config(&config);
            let order = if sorted {
                SortOrder::Ascending
            } else {
                SortOrder::Unsorted
            };
            cmd_filter(&path, &filter, order, &mut out)?;
        }
    }
    out.flush()?;
    Ok(())
}

fn describe(literal: &TimeLiteral, zone: TimeZone) -> String {
    format!("{:<10} {}", literal.kind(), literal.render(zone))
}

fn cmd_detect(
    literal: &str,
    config: &NanotickConfig,
    zone: TimeZone,
    out: &mut dyn Write,
) -> Result<()> {
    let Some(detected) = detect_literal_with_style(literal, config.date_style) else {
        bail!("'{literal}' is not a time literal");
    };
    writeln!(out, "{}", describe(&detected, zone))?;
    if let Some(precision) = parse_time_precision(literal) {
        writeln!(out, "precision  {precision}")?;
    }
    Ok(())
}

fn cmd_scan(
    expression: &str,
    config: &NanotickConfig,
    zone: TimeZone,
    out: &mut dyn Write,
) -> Result<()> {
    for found in scan_quoted_literals(expression, config.date_style) {
        let text = &expression[found.span.clone()];
        match &found.literal {
            Some(literal) => writeln!(
                out,
                "{:>4}..{:<4} {}",
                found.span.start,
                found.span.end,
                describe(literal, zone)
            )?,
            None => writeln!(
                out,
                "{:>4}..{:<4} not a time literal: {text}",
                found.span.start, found.span.end
            )?,
        }
    }
    Ok(())
}

fn cmd_plus(timestamp: &str, amount: &str, zone: TimeZone, out: &mut dyn Write) -> Result<()> {
    let start = parse_timestamp(timestamp)?;
    let result = match detect_literal_with_style(amount, Default::default()) {
        Some(TimeLiteral::Nanos(nanos)) => plus(Some(start), nanos)?,
        Some(TimeLiteral::Period(period)) => plus_period(Some(start), &period, zone)?,
        _ => bail!("'{amount}' is neither a duration nor a period"),
    };
    match result {
        Some(t) => writeln!(out, "{}", format_timestamp(t, zone))?,
        None => writeln!(out, "null")?,
    }
    Ok(())
}

fn cmd_pack(input: &Path, output: &Path, block_shift: u32, out: &mut dyn Write) -> Result<()> {
    let text = fs::read_to_string(input).with_context(|| format!("read {}", input.display()))?;
    let mut values: Vec<Option<Timestamp>> = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("null") {
            values.push(None);
            continue;
        }
        let t = parse_timestamp(line).with_context(|| format!("line {}", line_no + 1))?;
        values.push(Some(t));
    }
    write_column_file(output, &values, block_shift)?;
    writeln!(out, "wrote {} rows to {}", values.len(), output.display())?;
    Ok(())
}

fn cmd_filter(
    path: &Path,
    filter: &TimestampRangeFilter,
    order: SortOrder,
    out: &mut dyn Write,
) -> Result<()> {
    let storage = ExternalStorage::new(MmapBlockLoader::open(path)?);
    let rows = storage.row_count();
    let column: Arc<dyn TimestampSource> = Arc::new(TimestampColumn::from_storage(storage)?);
    let selection = if rows == 0 {
        RowSet::empty()
    } else {
        RowSet::from_range(0, rows - 1)
    };
    let matched = filter.filter(&selection, &column, false, order)?;
    writeln!(out, "{filter}: {} of {rows} rows ({order})", matched.size())?;
    Ok(())
}
