// Presentation of the aggregated tables: JSON and CSV exports, the district
// summary table and the data of the national votes chart.
// Nothing here sums votes: all the numbers come from the tables.

use serde::Serialize;
use serde_json::json;
use serde_json::Map as JSMap;
use std::collections::BTreeMap;
use tabled::{
    settings::{Panel, Style},
    Table, Tabled,
};

use crate::rollup::*;

/// Red-green scale used for percentages.
const PERCENT_PALETTE: [&str; 2] = ["#999999", "#29850E"];

/// Scale used for the number of registered voters, from green to brown.
const REGISTERED_PALETTE: [&str; 9] = [
    "#00A600", "#E6E600", "#E8C32E", "#D69C4E", "#DC863B", "#A0522D", "#8B4726", "#8B3626",
    "#A52A2A",
];

const DEFAULT_CANDIDATE_COLOR: &str = "gray";

// Below this share, the label of a bar is drawn outside of it.
const LABEL_INSIDE_THRESHOLD: f64 = 3.3;

fn json_float(x: f64) -> JSValue {
    if x.is_finite() {
        json!(x)
    } else {
        JSValue::Null
    }
}

fn labels_to_json(level: AdminLevel, labels: &[String], obj: &mut JSMap<String, JSValue>) {
    for (col, label) in level.key_columns().iter().zip(labels.iter()) {
        obj.insert(col.to_string(), json!(label));
    }
}

fn counts_to_json(counts: &Counts, turnout: f64, obj: &mut JSMap<String, JSValue>) {
    obj.insert("registered".to_string(), json!(counts.registered));
    obj.insert("valid".to_string(), json!(counts.valid));
    obj.insert("invalid".to_string(), json!(counts.invalid));
    obj.insert("total".to_string(), json!(counts.total));
    obj.insert("turnout".to_string(), json_float(turnout));
}

pub fn wide_table_to_json(table: &WideTable) -> JSValue {
    let rows: Vec<JSValue> = table
        .rows
        .iter()
        .map(|row| {
            let mut obj: JSMap<String, JSValue> = JSMap::new();
            labels_to_json(table.level, &row.labels, &mut obj);
            for (name, votes) in table.candidates.iter().zip(row.votes.iter()) {
                obj.insert(name.clone(), json!(votes));
            }
            counts_to_json(&row.counts, row.turnout, &mut obj);
            obj.insert("winner".to_string(), json!(row.winner()));
            JSValue::Object(obj)
        })
        .collect();
    JSValue::Array(rows)
}

pub fn long_table_to_json(table: &LongTable) -> JSValue {
    let rows: Vec<JSValue> = table
        .rows
        .iter()
        .map(|row| {
            let mut obj: JSMap<String, JSValue> = JSMap::new();
            labels_to_json(table.level, &row.labels, &mut obj);
            counts_to_json(&row.counts, row.turnout, &mut obj);
            obj.insert("candidate".to_string(), json!(row.candidate));
            obj.insert("votes".to_string(), json!(row.votes));
            obj.insert("won".to_string(), json!(row.won));
            obj.insert("rank".to_string(), json!(row.rank));
            JSValue::Object(obj)
        })
        .collect();
    JSValue::Array(rows)
}

pub fn statistics_to_json(stats: &NationalStatistics) -> JSValue {
    json!({
        "registered_voters": stats.registered_voters,
        "valid_voters": stats.valid_voters,
        "total_votes": stats.total_votes,
        "turnout": json_float(stats.turnout),
    })
}

/// The full output: statistics, the tables of the requested levels and the
/// reports that can be derived from them.
pub fn results_to_json(settings: &Settings, results: &AggregateResults) -> RollupResult<JSValue> {
    let stats = results.national_statistics().context(AggregationSnafu {})?;

    let mut tables: JSMap<String, JSValue> = JSMap::new();
    for level in settings.levels.iter() {
        tables.insert(
            format!("{}_wide", level.name()),
            wide_table_to_json(results.wide(*level)),
        );
        tables.insert(
            format!("{}_long", level.name()),
            long_table_to_json(results.long(*level)),
        );
    }

    let mut reports: JSMap<String, JSValue> = JSMap::new();
    if settings.levels.contains(&AdminLevel::District) {
        let summary =
            serde_json::to_value(district_summary(results)).context(ParsingJsonSnafu {})?;
        reports.insert("district_summary".to_string(), summary);
    }
    if settings.levels.contains(&AdminLevel::National) {
        let bars = serde_json::to_value(candidate_bars(results, &settings.candidate_colors)?)
            .context(ParsingJsonSnafu {})?;
        reports.insert("votes_for_each_candidate".to_string(), bars);
    }

    Ok(json!({
        "dataset": settings.dataset_name,
        "candidates": results.candidates(),
        "statistics": statistics_to_json(&stats),
        "tables": tables,
        "reports": reports,
    }))
}

// ******** CSV *********

fn write_csv_records(
    path: &Path,
    header: Vec<String>,
    records: Vec<Vec<String>>,
) -> RollupResult<()> {
    let path_s = path.display().to_string();
    let mut wtr = csv::Writer::from_path(path).context(CsvWriteSnafu {
        path: path_s.clone(),
    })?;
    wtr.write_record(&header).context(CsvWriteSnafu {
        path: path_s.clone(),
    })?;
    for rec in records.iter() {
        wtr.write_record(rec).context(CsvWriteSnafu {
            path: path_s.clone(),
        })?;
    }
    wtr.flush().context(WritingOutputSnafu { path: path_s })
}

fn counts_to_record(counts: &Counts, turnout: f64, rec: &mut Vec<String>) {
    for c in [counts.registered, counts.valid, counts.invalid, counts.total] {
        rec.push(c.to_string());
    }
    // NaN and inf are written as such.
    rec.push(turnout.to_string());
}

/// Writes `<level>_wide.csv` and `<level>_long.csv` for every level.
pub fn write_csv_tables(
    dir: &Path,
    results: &AggregateResults,
    levels: &[AdminLevel],
) -> RollupResult<Vec<PathBuf>> {
    let mut written: Vec<PathBuf> = Vec::new();
    for level in levels.iter() {
        let wide = results.wide(*level);
        let records: Vec<Vec<String>> = wide
            .rows
            .iter()
            .map(|row| {
                let mut rec: Vec<String> = row.labels.clone();
                rec.extend(row.votes.iter().map(|v| v.to_string()));
                counts_to_record(&row.counts, row.turnout, &mut rec);
                rec.push(row.winner());
                rec
            })
            .collect();
        let p = dir.join(format!("{}_wide.csv", level.name()));
        write_csv_records(&p, wide.columns(), records)?;
        written.push(p);

        let long = results.long(*level);
        let records: Vec<Vec<String>> = long
            .rows
            .iter()
            .map(|row| {
                let mut rec: Vec<String> = row.labels.clone();
                counts_to_record(&row.counts, row.turnout, &mut rec);
                rec.push(row.candidate.clone());
                rec.push(row.votes.to_string());
                rec.push(row.won.to_string());
                rec.push(row.rank.to_string());
                rec
            })
            .collect();
        let p = dir.join(format!("{}_long.csv", level.name()));
        write_csv_records(&p, long.columns(), records)?;
        written.push(p);
    }
    Ok(written)
}

// ******** Colors *********

fn parse_hex(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

/// Linear interpolation between the colors of a palette, for a position
/// between 0 and 1 (clamped). None if the position is not finite.
pub fn gradient_color(palette: &[&str], t: f64) -> Option<String> {
    if !t.is_finite() || palette.is_empty() {
        return None;
    }
    if palette.len() == 1 {
        return Some(palette[0].to_string());
    }
    let pos = t.clamp(0.0, 1.0) * (palette.len() - 1) as f64;
    let idx = (pos.floor() as usize).min(palette.len() - 2);
    let frac = pos - idx as f64;
    let (r1, g1, b1) = parse_hex(palette[idx])?;
    let (r2, g2, b2) = parse_hex(palette[idx + 1])?;
    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
    Some(format!(
        "#{:02X}{:02X}{:02X}",
        mix(r1, r2),
        mix(g1, g2),
        mix(b1, b2)
    ))
}

/// The color of a percentage, from grey (0%) to green (100%).
pub fn percent_color(pct: f64) -> Option<String> {
    gradient_color(&PERCENT_PALETTE, pct / 100.0)
}

// ******** Formatting *********

/// 1234567 -> "1,234,567"
pub fn format_integer(n: u64) -> String {
    let digits = n.to_string();
    let mut res = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, c) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            res.push(',');
        }
        res.push(c);
    }
    res
}

pub fn format_percent(pct: f64, decimals: usize) -> String {
    if pct.is_finite() {
        format!("{:.*}%", decimals, pct)
    } else {
        "-".to_string()
    }
}

// ******** Reports *********

/// One row of the district summary.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct DistrictSummary {
    pub district: String,
    pub registered: u64,
    pub invalid: u64,
    pub valid: u64,
    pub total: u64,
    /// As a fraction, not a percentage.
    pub turnout: f64,
    pub winner: String,
    pub registered_color: Option<String>,
    pub turnout_color: Option<String>,
}

/// Console variant of `DistrictSummary`.
#[derive(Debug, Tabled, Clone)]
pub struct DistrictSummaryPreview {
    #[tabled(rename = "District")]
    pub district: String,
    #[tabled(rename = "Registered")]
    pub registered: String,
    #[tabled(rename = "Invalid")]
    pub invalid: String,
    #[tabled(rename = "Valid")]
    pub valid: String,
    #[tabled(rename = "Total")]
    pub total: String,
    #[tabled(rename = "Turnout")]
    pub turnout: String,
    #[tabled(rename = "Winner")]
    pub winner: String,
}

pub fn district_summary(results: &AggregateResults) -> Vec<DistrictSummary> {
    let districts = results.wide(AdminLevel::District);
    let min_reg = districts.rows.iter().map(|r| r.counts.registered).min().unwrap_or(0);
    let max_reg = districts.rows.iter().map(|r| r.counts.registered).max().unwrap_or(0);
    districts
        .rows
        .iter()
        .map(|r| {
            let t = if max_reg > min_reg {
                (r.counts.registered - min_reg) as f64 / (max_reg - min_reg) as f64
            } else {
                0.0
            };
            DistrictSummary {
                district: r.labels[0].clone(),
                registered: r.counts.registered,
                invalid: r.counts.invalid,
                valid: r.counts.valid,
                total: r.counts.total,
                turnout: r.turnout / 100.0,
                winner: r.winner(),
                registered_color: gradient_color(&REGISTERED_PALETTE, t),
                turnout_color: percent_color(r.turnout),
            }
        })
        .collect()
}

fn district_summary_preview(rows: &[DistrictSummary]) -> Vec<DistrictSummaryPreview> {
    rows.iter()
        .map(|r| DistrictSummaryPreview {
            district: r.district.clone(),
            registered: format_integer(r.registered),
            invalid: format_integer(r.invalid),
            valid: format_integer(r.valid),
            total: format_integer(r.total),
            turnout: format_percent(r.turnout * 100.0, 0),
            winner: r.winner.clone(),
        })
        .collect()
}

/// One bar of the chart of the national votes per candidate.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CandidateBar {
    pub candidate: String,
    pub votes: u64,
    /// Percentage of the valid votes.
    pub share: f64,
    pub label: String,
    /// Where the label goes, relative to the end of the bar.
    pub align: String,
    pub color: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct CandidateBarPreview {
    #[tabled(rename = "Candidate")]
    pub candidate: String,
    #[tabled(rename = "Votes")]
    pub votes: String,
    #[tabled(rename = "Share")]
    pub share: String,
}

/// The national votes of each candidate, from the fewest to the most votes.
pub fn candidate_bars(
    results: &AggregateResults,
    colors: &BTreeMap<String, String>,
) -> RollupResult<Vec<CandidateBar>> {
    let stats = results.national_statistics().context(AggregationSnafu {})?;
    let mut rows: Vec<&LongRow> = results.long(AdminLevel::National).rows.iter().collect();
    // Stable: ties keep the candidate order.
    rows.sort_by_key(|r| r.votes);
    Ok(rows
        .iter()
        .map(|r| {
            let share = r.votes as f64 * 100.0 / stats.valid_voters as f64;
            CandidateBar {
                candidate: r.candidate.clone(),
                votes: r.votes,
                share,
                label: format_percent(share, 1),
                align: if share <= LABEL_INSIDE_THRESHOLD {
                    "left".to_string()
                } else {
                    "right".to_string()
                },
                color: colors
                    .get(&r.candidate)
                    .cloned()
                    .unwrap_or_else(|| DEFAULT_CANDIDATE_COLOR.to_string()),
            }
        })
        .collect())
}

/// The console report: national statistics, district summary and votes per candidate.
pub fn render_summary(settings: &Settings, results: &AggregateResults) -> RollupResult<String> {
    let stats = results.national_statistics().context(AggregationSnafu {})?;
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", settings.dataset_name));
    out.push_str(&format!(
        "Registered voters: {}\nValid votes: {}\nTotal votes: {}\nTurnout: {}\n\n",
        format_integer(stats.registered_voters),
        format_integer(stats.valid_voters),
        format_integer(stats.total_votes),
        format_percent(stats.turnout, 1)
    ));

    let mut districts = Table::new(district_summary_preview(&district_summary(results)));
    districts
        .with(Style::modern())
        .with(Panel::header("District Summary"));
    out.push_str(&districts.to_string());
    out.push_str("\n\n");

    let previews: Vec<CandidateBarPreview> = candidate_bars(results, &settings.candidate_colors)?
        .iter()
        .rev()
        .map(|b| CandidateBarPreview {
            candidate: b.candidate.clone(),
            votes: format_integer(b.votes),
            share: b.label.clone(),
        })
        .collect();
    let mut candidates = Table::new(previews);
    candidates
        .with(Style::modern())
        .with(Panel::header("Votes for each candidate"));
    out.push_str(&candidates.to_string());
    out.push('\n');
    Ok(out)
}
