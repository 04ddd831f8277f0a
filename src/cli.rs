//! Command-line interface argument parsing.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::bail;
use clap::{ArgAction, Parser, Subcommand};

use meddash::data::filter::Selection;

/// meddash - chart data for a patient-cohort dashboard
///
/// Loads a patient-visit table and derives the eight dashboard charts for a
/// selection of groups, as JSON chart descriptors.
///
/// Examples:
///   meddash --dataset visits.parquet groups
///   meddash --dataset visits.csv render --groups 1,3 --pretty
///   meddash --dataset visits.csv session < commands.txt
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Patient dataset (.csv, .json, .parquet)
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "dataset.csv",
        env = "MEDDASH_DATASET",
        global = true
    )]
    pub dataset: PathBuf,

    /// More log output (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// List the selectable patient groups
    Groups,

    /// Compute the eight charts once and write them as JSON
    Render {
        /// Groups to select (comma-separated); default is all groups
        #[arg(short, long, value_name = "GROUPS", value_delimiter = ',', conflicts_with = "none")]
        groups: Option<Vec<String>>,

        /// Select no group at all
        #[arg(long)]
        none: bool,

        /// Output file; stdout when omitted
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Read selection commands from stdin and answer each with a JSON line
    ///
    /// Commands: `all`, `none`, `toggle <GROUP>`, `select <G1,G2,...>`.
    Session,
}

impl Args {
    /// Default `env_logger` filter for the verbosity flag.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// One line of `session` input.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    All,
    None,
    Toggle(String),
    Select(Selection),
}

impl FromStr for SessionCommand {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = line
            .split_once(char::is_whitespace)
            .map(|(v, r)| (v, r.trim()))
            .unwrap_or((line, ""));
        match verb {
            "all" => Ok(SessionCommand::All),
            "none" => Ok(SessionCommand::None),
            "toggle" if !rest.is_empty() => Ok(SessionCommand::Toggle(rest.to_string())),
            "select" => Ok(SessionCommand::Select(
                rest.split(',')
                    .map(str::trim)
                    .filter(|g| !g.is_empty())
                    .map(str::to_string)
                    .collect(),
            )),
            _ => bail!("unknown session command '{line}'"),
        }
    }
}
