use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::PageSize;

#[derive(Debug, Parser)]
#[command(author, version, about = "Compare control and test datasets cell by cell", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compare two datasets and write a PDF report highlighting mismatched cells
    Compare(CompareArgs),
    /// Show a dataset as loaded, optionally with the inferred type of each cell
    Preview(PreviewArgs),
}

#[derive(Debug, Args)]
pub struct CompareArgs {
    /// Reference dataset treated as ground truth (CSV, TSV or .xlsx)
    #[arg(short = 'c', long = "control")]
    pub control: PathBuf,
    /// Dataset checked against the control (CSV, TSV or .xlsx)
    #[arg(short = 't', long = "test")]
    pub test: PathBuf,
    /// Destination PDF report
    #[arg(short = 'o', long = "output", default_value = "comparison_report.pdf")]
    pub output: PathBuf,
    /// YAML file with report settings (title, page size, colors)
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Report title (overrides the config file)
    #[arg(long)]
    pub title: Option<String>,
    /// Page size (overrides the config file)
    #[arg(long = "page-size", value_enum)]
    pub page_size: Option<PageSize>,
    /// Portrait pages instead of landscape
    #[arg(long)]
    pub portrait: bool,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of both input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Keep every cell as text instead of inferring numbers, booleans and dates
    #[arg(long)]
    pub raw: bool,
    /// Also print the highlighted control table and mismatch summary to stdout
    #[arg(long)]
    pub show: bool,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// Input file to preview (CSV, TSV or .xlsx)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Number of rows to display
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
    /// Annotate each cell with its inferred type
    #[arg(long)]
    pub types: bool,
    /// Keep every cell as text instead of inferring types
    #[arg(long)]
    pub raw: bool,
    /// CSV delimiter character
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding for input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_delimiter_accepts_names_and_single_characters() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter("semicolon"), Ok(b';'));
        assert_eq!(parse_delimiter(":"), Ok(b':'));
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter("ab").is_err());
        assert!(parse_delimiter("é").is_err());
    }

    #[test]
    fn compare_defaults_output_path() {
        let cli = Cli::try_parse_from(["cellcheck", "compare", "-c", "a.csv", "-t", "b.csv"])
            .expect("parse");
        match cli.command {
            Commands::Compare(args) => {
                assert_eq!(args.output, PathBuf::from("comparison_report.pdf"));
                assert!(args.page_size.is_none());
                assert!(!args.portrait);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
