use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod formatters;
pub mod help;
pub mod runner;

#[derive(Parser)]
#[command(name = "ruptura")]
#[command(
    version,
    about = "Stockout (ruptura) reports from store stock and sales spreadsheets"
)]
#[command(
    long_about = "Identify stock, sales curve and inbound goods spreadsheets, reconcile store stock against the matrix store and historical average sales, and flag products in stockout."
)]
pub struct Cli {
    /// Settings file (defaults to <config dir>/ruptura/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Disable colorized/ANSI output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the known spreadsheet layouts in detection order
    Models,

    /// Identify the layout of a spreadsheet
    Detect {
        /// Path to the Excel or CSV file
        file: PathBuf,
    },

    /// Extract a spreadsheet and show its summary and preview
    Extract {
        /// Path to the Excel or CSV file
        file: PathBuf,

        /// Rows shown in the preview
        #[arg(short, long)]
        rows: Option<usize>,

        /// Write the extracted records to this .xlsx file
        #[arg(short, long)]
        export: Option<PathBuf>,
    },

    /// Build the stockout report from a stock table and a sales curve
    Reconcile {
        /// Stock-by-store spreadsheet
        #[arg(long)]
        stock: PathBuf,

        /// Sales-curve-by-store spreadsheet
        #[arg(long)]
        curve: PathBuf,

        /// Average sales workbook (defaults to the configured path)
        #[arg(long)]
        average: Option<PathBuf>,

        /// Keep only rows whose COLUMN is one of the values (repeatable)
        #[arg(short, long = "filter", value_name = "COLUMN=V1,V2")]
        filters: Vec<String>,

        /// Keep only stores of a macro: emporio, mercearia or outros (repeatable)
        #[arg(long = "stores", value_name = "MACRO")]
        store_macros: Vec<String>,

        /// Rows shown in the preview
        #[arg(short, long)]
        rows: Option<usize>,

        /// Write the report to this .xlsx file (a directory gets the default name)
        #[arg(short, long)]
        export: Option<PathBuf>,

        /// Print the report rows as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Run a catalog report over any mix of input files
    Report {
        /// Input spreadsheets
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Report name; defaults to the first report offered for the inputs
        #[arg(long)]
        kind: Option<String>,

        /// Rows shown in the preview
        #[arg(short, long)]
        rows: Option<usize>,
    },

    /// Show the group → buyer mapping
    Buyers {
        /// Only list the groups of this buyer
        #[arg(long)]
        buyer: Option<String>,
    },
}
