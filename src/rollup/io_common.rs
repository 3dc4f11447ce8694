// Conversion of the raw tables read by the providers into a fact table.

use std::collections::HashSet;
use std::path::Path;

use crate::rollup::config_reader::ColumnNames;
use crate::rollup::*;

/// A row, as read by the providers. All the cells are kept as strings.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ParsedRow {
    /// 1-based line number in the source file, header included.
    pub lineno: usize,
    pub cells: Vec<String>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ParsedTable {
    pub header: Vec<String>,
    pub rows: Vec<ParsedRow>,
}

/// How the candidate columns are found in the header.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum CandidateSelection {
    /// Explicit column names, in this order.
    Named(Vec<String>),
    /// 1-based column indexes, both included.
    Range { first: usize, last: usize },
    /// All the columns that are neither administrative nor count columns.
    Remaining,
}

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

fn find_column(header: &[String], name: &str) -> RollupResult<usize> {
    header
        .iter()
        .position(|h| h.trim() == name)
        .context(MissingColumnSnafu { column: name })
}

fn candidate_columns(
    header: &[String],
    selection: &CandidateSelection,
    used: &HashSet<usize>,
) -> RollupResult<Vec<(usize, String)>> {
    let res: Vec<(usize, String)> = match selection {
        CandidateSelection::Named(names) => {
            let mut res = Vec::new();
            for name in names {
                res.push((find_column(header, name)?, name.clone()));
            }
            res
        }
        CandidateSelection::Range { first, last } => {
            for idx in [*first, *last] {
                ensure!(
                    idx >= 1 && idx <= header.len(),
                    ColumnIndexOutOfRangeSnafu {
                        index: idx,
                        width: header.len()
                    }
                );
            }
            (*first..=*last)
                .map(|idx| (idx - 1, header[idx - 1].trim().to_string()))
                .collect()
        }
        CandidateSelection::Remaining => header
            .iter()
            .enumerate()
            .filter(|(idx, h)| !used.contains(idx) && !h.trim().is_empty())
            .map(|(idx, h)| (idx, h.trim().to_string()))
            .collect(),
    };
    for (idx, name) in res.iter() {
        if used.contains(idx) {
            whatever!(
                "Column {:?} cannot be both a candidate and an administrative or count column",
                name
            )
        }
    }
    Ok(res)
}

fn read_count(row: &ParsedRow, idx: usize, column: &str) -> RollupResult<u64> {
    let cell = row.cells.get(idx).context(LineTooShortSnafu {
        lineno: row.lineno,
        column: idx + 1,
    })?;
    let cell = cell.trim();
    // A blank cell is an empty count.
    if cell.is_empty() {
        return Ok(0);
    }
    cell.parse::<u64>().context(BadCountSnafu {
        lineno: row.lineno,
        column,
        value: cell,
    })
}

/// Maps the columns of the header and checks every row.
///
/// Fails on the first missing column or unreadable cell: a partial list of
/// candidates would give wrong winners.
pub fn build_fact_table(
    table: &ParsedTable,
    columns: &ColumnNames,
    selection: &CandidateSelection,
) -> RollupResult<FactTable> {
    let admin_names = columns.admin_columns();
    let count_names = columns.count_columns();

    let mut admin_idxs: Vec<usize> = Vec::new();
    for name in admin_names.iter() {
        admin_idxs.push(find_column(&table.header, name)?);
    }
    let mut count_idxs: Vec<usize> = Vec::new();
    for name in count_names.iter() {
        count_idxs.push(find_column(&table.header, name)?);
    }
    let used: HashSet<usize> = admin_idxs.iter().chain(count_idxs.iter()).cloned().collect();

    let cand_cols = candidate_columns(&table.header, selection, &used)?;
    debug!("build_fact_table: candidate columns: {:?}", cand_cols);
    let names: Vec<String> = cand_cols.iter().map(|(_, n)| n.clone()).collect();

    let mut builder = Builder::new(&names).context(AggregationSnafu {})?;
    for row in table.rows.iter() {
        if row.cells.iter().all(|c| c.trim().is_empty()) {
            debug!("build_fact_table: skipping empty line {}", row.lineno);
            continue;
        }
        let mut labels: [String; 5] = Default::default();
        for (pos, idx) in admin_idxs.iter().enumerate() {
            labels[pos] = row
                .cells
                .get(*idx)
                .context(LineTooShortSnafu {
                    lineno: row.lineno,
                    column: idx + 1,
                })?
                .trim()
                .to_string();
        }
        let mut votes: Vec<u64> = Vec::with_capacity(cand_cols.len());
        for (idx, name) in cand_cols.iter() {
            votes.push(read_count(row, *idx, name)?);
        }
        let counts = Counts {
            registered: read_count(row, count_idxs[0], &count_names[0])?,
            valid: read_count(row, count_idxs[1], &count_names[1])?,
            invalid: read_count(row, count_idxs[2], &count_names[2])?,
            total: read_count(row, count_idxs[3], &count_names[3])?,
        };
        builder
            .add_station(labels, &votes, counts)
            .context(AggregationSnafu {})?;
    }
    Ok(builder.build())
}
