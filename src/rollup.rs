use log::{debug, info, warn};

use election_rollup::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;

pub mod config_reader;
pub mod io_common;
pub mod io_csv;
pub mod io_excel;
pub mod report;

use crate::rollup::config_reader::*;
use crate::rollup::io_common::ParsedTable;

#[derive(Debug, Snafu)]
pub enum RollupError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The workbook has no worksheet"))]
    EmptyExcel {},
    #[snafu(display("Worksheet {name:?} not found"))]
    MissingWorksheet { name: String },
    #[snafu(display("Line {lineno}: could not understand cell {content}"))]
    ExcelWrongCellType { lineno: usize, content: String },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Expected a column index, found {value}"))]
    ParsingJsonNumber { value: String },
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading a CSV line"))]
    CsvLineParse { source: csv::Error },
    #[snafu(display("Line {lineno}: the line is too short, no cell in column {column}"))]
    LineTooShort { lineno: usize, column: usize },
    #[snafu(display("Column {column:?} not found in the header"))]
    MissingColumn { column: String },
    #[snafu(display("Column index {index} is outside of the header (1..={width})"))]
    ColumnIndexOutOfRange { index: usize, width: usize },
    #[snafu(display("Line {lineno}, column {column:?}: {value:?} is not a count"))]
    BadCount {
        source: std::num::ParseIntError,
        lineno: usize,
        column: String,
        value: String,
    },
    #[snafu(display("Invalid dataset"))]
    Aggregation { source: AggregationErrors },
    #[snafu(display("Error writing {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing CSV file {path}"))]
    CsvWrite { source: csv::Error, path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type RollupResult<T> = Result<T, RollupError>;

/// Reads the polling station results and assembles the fact table.
pub fn load_fact_table(settings: &Settings) -> RollupResult<FactTable> {
    let path = settings.data_path.display().to_string();
    info!("Attempting to read {:?} file {:?}", settings.provider, path);
    let table: ParsedTable = match settings.provider {
        Provider::Csv => io_csv::read_csv_table(&path)?,
        Provider::Xlsx => io_excel::read_excel_table(&path, settings.worksheet.as_deref())?,
    };
    debug!(
        "load_fact_table: header: {:?}, {} rows",
        table.header,
        table.rows.len()
    );
    io_common::build_fact_table(&table, &settings.columns, &settings.candidates)
}

pub fn run_rollup(args: &Args) -> RollupResult<()> {
    let settings = resolve_settings(args)?;
    info!("settings: {:?}", settings);

    let fact_table = load_fact_table(&settings)?;
    info!(
        "Loaded {} stations, candidates: {:?}",
        fact_table.stations().len(),
        fact_table.candidates()
    );

    let results = build(&fact_table);
    let stats = results.national_statistics().context(AggregationSnafu {})?;
    info!(
        "National: {} registered, {} valid, {} votes, turnout {:.2}%",
        stats.registered_voters, stats.valid_voters, stats.total_votes, stats.turnout
    );

    match settings.format {
        OutputFormat::Json => write_json(&settings, &results),
        OutputFormat::Csv => write_csv(&settings, &results),
        OutputFormat::Summary => write_summary(&settings, &results),
    }
}

fn write_json(settings: &Settings, results: &AggregateResults) -> RollupResult<()> {
    let js = report::results_to_json(settings, results)?;
    let pretty_js = serde_json::to_string_pretty(&js).context(ParsingJsonSnafu {})?;

    match output_file(settings, "results.json")? {
        Some(p) => write_text(&p, &pretty_js)?,
        None => println!("{}", pretty_js),
    }

    // The reference output, if provided for comparison
    if let Some(reference_p) = &settings.reference {
        check_reference(reference_p, &pretty_js)?;
    }
    Ok(())
}

fn write_csv(settings: &Settings, results: &AggregateResults) -> RollupResult<()> {
    let dir: PathBuf = match (&settings.out, &settings.output_directory) {
        (Some(o), _) if o != "stdout" => PathBuf::from(o),
        (None, Some(d)) => d.clone(),
        _ => whatever!("The csv format needs an output directory"),
    };
    fs::create_dir_all(&dir).context(WritingOutputSnafu {
        path: dir.display().to_string(),
    })?;
    let written = report::write_csv_tables(&dir, results, &settings.levels)?;
    info!("Wrote {} files in {}", written.len(), dir.display());
    Ok(())
}

fn write_summary(settings: &Settings, results: &AggregateResults) -> RollupResult<()> {
    let text = report::render_summary(settings, results)?;
    match output_file(settings, "summary.txt")? {
        Some(p) => write_text(&p, &text),
        None => {
            println!("{}", text);
            Ok(())
        }
    }
}

// None means the standard output.
fn output_file(settings: &Settings, default_name: &str) -> RollupResult<Option<PathBuf>> {
    match (&settings.out, &settings.output_directory) {
        (Some(o), _) if o == "stdout" => Ok(None),
        (Some(o), _) => Ok(Some(PathBuf::from(o))),
        (None, Some(d)) => {
            fs::create_dir_all(d).context(WritingOutputSnafu {
                path: d.display().to_string(),
            })?;
            Ok(Some(d.join(default_name)))
        }
        (None, None) => Ok(None),
    }
}

fn write_text(path: &Path, text: &str) -> RollupResult<()> {
    info!("Writing output to {}", path.display());
    fs::write(path, text).context(WritingOutputSnafu {
        path: path.display().to_string(),
    })
}

fn check_reference(reference_p: &str, pretty_js: &str) -> RollupResult<()> {
    let contents = fs::read_to_string(reference_p).context(OpeningJsonSnafu { path: reference_p })?;
    let reference: JSValue = serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
    let pretty_reference = serde_json::to_string_pretty(&reference).context(ParsingJsonSnafu {})?;
    if pretty_reference != pretty_js {
        warn!("Found differences with the reference output");
        print_diff(pretty_reference.as_str(), pretty_js, "\n");
        whatever!("Difference detected between computed output and reference output")
    }
    info!("Output matches the reference {}", reference_p);
    Ok(())
}
