use clap::Parser;

/// This program aggregates polling station results to every administrative level.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON file describing the dataset and the outputs.
    /// For more information about the file format, read the manual of the election_rollup crate.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,
    /// (file path) A reference file containing the expected JSON output. If provided, rollup will
    /// check that the computed output matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, directory, 'stdout' or empty) Where to write the output. A directory is
    /// expected for the csv format. Setting this option overrides the output directory of the
    /// --config option.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path or empty) The polling station results. Setting this option overrides the
    /// data source of the --config option.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (csv or xlsx) The type of the input. By default, guessed from the extension of the file.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (list of values or not specified) The names of the candidate columns, in order.
    /// If not specified, they are discovered from the header of the input.
    #[clap(long, value_parser)]
    pub candidates: Option<Vec<String>>,

    /// When using an Excel file, indicates the name of the worksheet to use. The first one by
    /// default.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// (json, csv or summary, default json) The output format.
    #[clap(short, long, value_parser)]
    pub format: Option<String>,

    /// (list of values or not specified) The levels to output: stations, parishes, subcounties,
    /// constituencies, districts, national. All of them by default.
    #[clap(short, long, value_parser)]
    pub level: Option<Vec<String>>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
