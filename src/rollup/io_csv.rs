// Primitives for reading CSV files.

use crate::rollup::{
    io_common::{ParsedRow, ParsedTable},
    *,
};

/// Reads a CSV file with a header row.
///
/// Rows may have a different number of cells: short rows are reported later,
/// with the column that is missing.
pub fn read_csv_table(path: &str) -> RollupResult<ParsedTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;

    let header: Vec<String> = rdr
        .headers()
        .context(CsvLineParseSnafu {})?
        .iter()
        .map(|s| s.trim().to_string())
        .collect();
    debug!("read_csv_table: header: {:?}", header);

    let mut rows: Vec<ParsedRow> = Vec::new();
    for (idx, line_r) in rdr.records().enumerate() {
        // The header is the first line
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu {})?;
        rows.push(ParsedRow {
            lineno,
            cells: line.iter().map(|s| s.to_string()).collect(),
        });
    }
    Ok(ParsedTable { header, rows })
}
