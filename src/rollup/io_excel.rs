// Reading of the polling station results from an Excel workbook.

use calamine::{open_workbook, DataType, Reader, Xlsx};

use crate::rollup::{
    io_common::{ParsedRow, ParsedTable},
    *,
};

/// Reads the given worksheet, or the first one of the workbook.
/// The first row is the header.
pub fn read_excel_table(path: &str, worksheet: Option<&str>) -> RollupResult<ParsedTable> {
    debug!(
        "read_excel_table: path: {:?} worksheet: {:?}",
        path, worksheet
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;

    let wrange = match worksheet {
        Some(name) => workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu { name })?
            .context(OpeningExcelSnafu { path })?,
        None => workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu {})?
            .context(OpeningExcelSnafu { path })?,
    };

    let mut iter = wrange.rows();
    let header_row = iter.next().context(EmptyExcelSnafu {})?;
    let mut header: Vec<String> = Vec::with_capacity(header_row.len());
    for cell in header_row.iter() {
        header.push(cell_to_string(cell, 1)?.trim().to_string());
    }
    debug!("read_excel_table: header: {:?}", header);

    let mut rows: Vec<ParsedRow> = Vec::new();
    for (idx, row) in iter.enumerate() {
        let lineno = idx + 2;
        let mut cells: Vec<String> = Vec::with_capacity(row.len());
        for cell in row.iter() {
            cells.push(cell_to_string(cell, lineno)?);
        }
        rows.push(ParsedRow { lineno, cells });
    }
    Ok(ParsedTable { header, rows })
}

fn cell_to_string(cell: &DataType, lineno: usize) -> RollupResult<String> {
    match cell {
        DataType::Empty => Ok(String::new()),
        DataType::String(s) => Ok(s.clone()),
        DataType::Int(i) => Ok(i.to_string()),
        // Counts are often stored as floats.
        DataType::Float(f) if *f >= 0.0 && f.fract() == 0.0 && *f < u64::MAX as f64 => {
            Ok((*f as u64).to_string())
        }
        DataType::Float(f) => Ok(f.to_string()),
        DataType::Bool(b) => Ok(b.to_string()),
        x => ExcelWrongCellTypeSnafu {
            lineno,
            content: format!("{:?}", x),
        }
        .fail(),
    }
}
