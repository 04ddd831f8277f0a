mod cli;

use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use cli::{Args, Command, SessionCommand};
use meddash::charts::{compute, ChartSet};
use meddash::data::filter::{init_selection, Selection};
use meddash::data::loader::load_file;
use meddash::data::model::Dataset;
use meddash::state::DashboardState;

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_filter()))
        .init();

    // A dataset that fails to load stops everything: no partial dashboard.
    let dataset = match load_file(&args.dataset) {
        Ok(dataset) => Arc::new(dataset),
        Err(e) => {
            log::error!("Failed to load {}: {e:#}", args.dataset.display());
            return Err(e.context(format!("loading {}", args.dataset.display())));
        }
    };
    log::info!(
        "Loaded {} records in {} groups from {}",
        dataset.len(),
        dataset.groups().len(),
        args.dataset.display()
    );

    match args.command {
        Command::Groups => print_groups(&dataset),
        Command::Render {
            groups,
            none,
            output,
            pretty,
        } => {
            let selection = match (groups, none) {
                (_, true) => Selection::new(),
                (Some(groups), false) => groups.into_iter().collect(),
                (None, false) => init_selection(&dataset),
            };
            render(&dataset, &selection, output.as_deref(), pretty)
        }
        Command::Session => run_session(dataset, io::stdin().lock(), io::stdout().lock()),
    }
}

fn print_groups(dataset: &Dataset) -> Result<()> {
    let mut out = io::stdout().lock();
    for option in dataset.group_options() {
        writeln!(out, "{}\t{}", option.value, option.label)?;
    }
    Ok(())
}

fn render(
    dataset: &Dataset,
    selection: &Selection,
    output: Option<&Path>,
    pretty: bool,
) -> Result<()> {
    let charts = compute(dataset, selection);
    let writer: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    };
    write_json(writer, &charts, pretty)?;
    if let Some(path) = output {
        log::info!("Wrote charts to {}", path.display());
    }
    Ok(())
}

fn write_json(mut writer: impl Write, charts: &ChartSet, pretty: bool) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut writer, charts)?;
    } else {
        serde_json::to_writer(&mut writer, charts)?;
    }
    writeln!(writer)?;
    writer.flush().context("flushing chart output")
}

/// One reply per session command, plus one for the initial selection.
#[derive(Serialize)]
struct SessionReply<'a> {
    generation: u64,
    selection: &'a Selection,
    charts: &'a ChartSet,
}

fn write_reply(out: &mut impl Write, state: &DashboardState) -> Result<()> {
    let reply = SessionReply {
        generation: state.generation(),
        selection: state.selection(),
        charts: state.charts(),
    };
    serde_json::to_writer(&mut *out, &reply)?;
    writeln!(out)?;
    out.flush().context("flushing session reply")
}

/// Request loop: answers first with the all-groups charts, then every
/// selection change recomputes all eight charts and answers with the
/// complete set.
fn run_session(dataset: Arc<Dataset>, input: impl BufRead, mut out: impl Write) -> Result<()> {
    let mut state = DashboardState::new(dataset);
    write_reply(&mut out, &state)?;

    for line in input.lines() {
        let line = line.context("reading session input")?;
        if line.trim().is_empty() {
            continue;
        }
        let command = match line.parse::<SessionCommand>() {
            Ok(command) => command,
            Err(e) => {
                log::warn!("{e}");
                eprintln!("error: {e}");
                continue;
            }
        };
        match command {
            SessionCommand::All => state.select_all(),
            SessionCommand::None => state.select_none(),
            SessionCommand::Toggle(group) => state.toggle_group(&group),
            SessionCommand::Select(selection) => state.set_selection(selection),
        }
        write_reply(&mut out, &state)?;
    }
    Ok(())
}
