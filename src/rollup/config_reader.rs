use crate::args::Args;
use crate::rollup::io_common::{simplify_file_name, CandidateSelection};
use crate::rollup::*;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "datasetName")]
    pub dataset_name: String,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    pub format: Option<String>,
    pub levels: Option<Vec<String>>,
    #[serde(rename = "candidateColors")]
    pub candidate_colors: Option<BTreeMap<String, String>>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct DataSource {
    pub provider: Option<String>,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
    #[serde(rename = "firstCandidateColumnIndex")]
    _first_candidate_column_index: Option<JSValue>,
    #[serde(rename = "lastCandidateColumnIndex")]
    _last_candidate_column_index: Option<JSValue>,
}

impl DataSource {
    /// 1-based, as in a spreadsheet.
    pub fn first_candidate_column_index(&self) -> RollupResult<Option<usize>> {
        self._first_candidate_column_index
            .as_ref()
            .map(read_js_int)
            .transpose()
    }

    pub fn last_candidate_column_index(&self) -> RollupResult<Option<usize>> {
        self._last_candidate_column_index
            .as_ref()
            .map(read_js_int)
            .transpose()
    }
}

/// Names of the administrative and count columns in the header of the dataset.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnNames {
    pub district: Option<String>,
    pub constituency: Option<String>,
    pub subcounty: Option<String>,
    pub parish: Option<String>,
    pub station: Option<String>,
    pub registered: Option<String>,
    pub valid: Option<String>,
    pub invalid: Option<String>,
    pub total: Option<String>,
}

impl ColumnNames {
    /// In the order of ADMIN_REGION_COLS.
    pub fn admin_columns(&self) -> [String; 5] {
        let renamed = [
            &self.district,
            &self.constituency,
            &self.subcounty,
            &self.parish,
            &self.station,
        ];
        let mut res: [String; 5] = Default::default();
        for (idx, name) in ADMIN_REGION_COLS.iter().enumerate() {
            res[idx] = renamed[idx].clone().unwrap_or_else(|| name.to_string());
        }
        res
    }

    /// In the order of COUNT_COLS.
    pub fn count_columns(&self) -> [String; 4] {
        let renamed = [&self.registered, &self.valid, &self.invalid, &self.total];
        let mut res: [String; 4] = Default::default();
        for (idx, name) in COUNT_COLS.iter().enumerate() {
            res[idx] = renamed[idx].clone().unwrap_or_else(|| name.to_string());
        }
        res
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RollupConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    #[serde(rename = "dataSource")]
    pub data_source: DataSource,
    pub candidates: Option<Vec<String>>,
    pub columns: Option<ColumnNames>,
}

impl RollupConfig {
    /// The configuration when only an input file is given.
    pub fn from_input(path: &str) -> RollupConfig {
        RollupConfig {
            output_settings: OutputSettings {
                dataset_name: simplify_file_name(path),
                output_directory: None,
                format: None,
                levels: None,
                candidate_colors: None,
            },
            data_source: DataSource {
                provider: None,
                file_path: path.to_string(),
                excel_worksheet_name: None,
                _first_candidate_column_index: None,
                _last_candidate_column_index: None,
            },
            candidates: None,
            columns: None,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Provider {
    Csv,
    Xlsx,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum OutputFormat {
    Json,
    Csv,
    Summary,
}

/// Everything needed for one run, once the configuration file and the
/// command line have been merged.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Settings {
    pub dataset_name: String,
    pub data_path: PathBuf,
    pub provider: Provider,
    pub worksheet: Option<String>,
    pub columns: ColumnNames,
    pub candidates: CandidateSelection,
    pub candidate_colors: BTreeMap<String, String>,
    pub levels: Vec<AdminLevel>,
    pub format: OutputFormat,
    pub out: Option<String>,
    pub output_directory: Option<PathBuf>,
    pub reference: Option<String>,
}

pub fn read_config(path: &str) -> RollupResult<RollupConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: RollupConfig = serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
    Ok(config)
}

/// Merges the configuration file (if any) with the command line.
/// The command line always wins.
pub fn resolve_settings(args: &Args) -> RollupResult<Settings> {
    let (config, root) = match &args.config {
        Some(config_path) => {
            let config = read_config(config_path)?;
            debug!("resolve_settings: config: {:?}", config);
            let root = Path::new(config_path)
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_default();
            (config, root)
        }
        None => match &args.input {
            Some(input) => (RollupConfig::from_input(input), PathBuf::new()),
            None => whatever!("Either --config or --input must be provided"),
        },
    };

    // An input given on the command line is relative to the working directory.
    let data_path: PathBuf = match &args.input {
        Some(input) => PathBuf::from(input),
        None => root.join(&config.data_source.file_path),
    };

    let provider_name: Option<String> = args
        .input_type
        .clone()
        .or_else(|| config.data_source.provider.clone());
    let provider = match provider_name.as_deref() {
        Some(p) => parse_provider(p)?,
        None => guess_provider(&data_path),
    };

    let candidates: CandidateSelection = match (&args.candidates, &config.candidates) {
        (Some(cs), _) | (None, Some(cs)) => CandidateSelection::Named(cs.clone()),
        (None, None) => match (
            config.data_source.first_candidate_column_index()?,
            config.data_source.last_candidate_column_index()?,
        ) {
            (Some(first), Some(last)) => CandidateSelection::Range { first, last },
            (None, None) => CandidateSelection::Remaining,
            x => whatever!(
                "Both firstCandidateColumnIndex and lastCandidateColumnIndex must be provided, found {:?}",
                x
            ),
        },
    };

    let level_names: Option<Vec<String>> = args
        .level
        .clone()
        .or_else(|| config.output_settings.levels.clone());
    let levels: Vec<AdminLevel> = match level_names {
        Some(names) => parse_levels(&names)?,
        None => AdminLevel::ALL.to_vec(),
    };

    let format_name: Option<String> = args
        .format
        .clone()
        .or_else(|| config.output_settings.format.clone());
    let format = match format_name.as_deref() {
        None | Some("json") => OutputFormat::Json,
        Some("csv") => OutputFormat::Csv,
        Some("summary") => OutputFormat::Summary,
        Some(x) => whatever!("Unknown output format {:?}", x),
    };

    Ok(Settings {
        dataset_name: config.output_settings.dataset_name.clone(),
        data_path,
        provider,
        worksheet: args
            .excel_worksheet_name
            .clone()
            .or_else(|| config.data_source.excel_worksheet_name.clone()),
        columns: config.columns.clone().unwrap_or_default(),
        candidates,
        candidate_colors: config
            .output_settings
            .candidate_colors
            .clone()
            .unwrap_or_default(),
        levels,
        format,
        out: args.out.clone(),
        output_directory: config
            .output_settings
            .output_directory
            .as_ref()
            .map(|d| root.join(d)),
        reference: args.reference.clone(),
    })
}

fn parse_provider(name: &str) -> RollupResult<Provider> {
    match name {
        "csv" => Ok(Provider::Csv),
        "xlsx" | "excel" => Ok(Provider::Xlsx),
        x => whatever!("Provider not implemented {:?}", x),
    }
}

fn guess_provider(path: &Path) -> Provider {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("xlsx") => Provider::Xlsx,
        _ => Provider::Csv,
    }
}

fn parse_levels(names: &[String]) -> RollupResult<Vec<AdminLevel>> {
    let mut res: Vec<AdminLevel> = Vec::new();
    for name in names {
        match AdminLevel::from_name(name) {
            Some(level) if !res.contains(&level) => res.push(level),
            Some(_) => {}
            None => whatever!("Unknown level {:?}", name),
        }
    }
    // Always output the levels from the finest to the coarsest.
    res.sort();
    Ok(res)
}

fn read_js_int(x: &JSValue) -> RollupResult<usize> {
    match x {
        JSValue::Number(n) => n
            .as_u64()
            .filter(|i| *i > 0)
            .map(|i| i as usize)
            .context(ParsingJsonNumberSnafu {
                value: n.to_string(),
            }),
        // Excel-style column names: A is 1, Z is 26, AA is 27.
        JSValue::String(s) if !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic()) => Ok(s
            .to_ascii_uppercase()
            .bytes()
            .fold(0, |acc, b| acc * 26 + (b - b'A' + 1) as usize)),
        JSValue::String(s) => s
            .parse::<usize>()
            .ok()
            .filter(|i| *i > 0)
            .context(ParsingJsonNumberSnafu { value: s.clone() }),
        _ => None.context(ParsingJsonNumberSnafu {
            value: x.to_string(),
        }),
    }
}
