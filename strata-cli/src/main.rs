use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use strata_core::graph::DetachedGraph;
use strata_core::state::TypedNode;
use strata_core::{Config, Connection, Project};

const USAGE: &str = "usage: strata [--verbose] [--config <file>] <demo [--save <file>] | dump <file>>";

fn init_logging(verbose: bool) {
    use simplelog::{LevelFilter, WriteLogger};

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };

    let log_path = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("strata")
        .join("strata.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = match File::create(&log_path) {
        Ok(file) => file,
        Err(_) => match File::create(std::env::temp_dir().join("strata.log")) {
            Ok(file) => file,
            Err(e) => {
                eprintln!("strata: cannot create log file: {}", e);
                return;
            }
        },
    };

    if let Err(e) = WriteLogger::init(log_level, simplelog::Config::default(), log_file) {
        eprintln!("strata: logger already initialised: {}", e);
        return;
    }

    log::info!("strata starting (log level: {:?})", log_level);
}

fn flag_value(args: &[String], flag: &str) -> Option<PathBuf> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from)
}

/// One line per track, then its processors by slot.
fn print_summary(project: &Project) {
    let state = project.state();
    let tree = state.tree();
    for track in state.tracks() {
        let Some(TypedNode::Track(t)) = TypedNode::of(tree, track) else {
            continue;
        };
        let marker = if t.is_master(tree) { " (master)" } else { "" };
        println!("{}{} {}", t.name(tree), marker, t.colour(tree));
        for processor in state.processors(track) {
            if let Some(TypedNode::Processor(p)) = TypedNode::of(tree, processor) {
                let bypassed = if p.is_bypassed(tree) { " [bypassed]" } else { "" };
                println!("  {:>3}  {}{}", p.slot(tree), p.name(tree), bypassed);
            }
        }
    }
}

fn print_project(project: &Project) -> Result<(), String> {
    print_summary(project);
    let state = project.state();
    let value = state
        .tree()
        .snapshot(state.project_node())
        .ok_or("project root missing")?;
    let json = serde_json::to_string_pretty(&value).map_err(|e| e.to_string())?;
    println!("{}", json);
    Ok(())
}

/// Scripted edit session: build a small chain, paste it elsewhere, wire a
/// custom edge, then walk the history back and forth.
fn run_demo(config: &Config, save_to: Option<&Path>) -> Result<(), String> {
    let mut project = Project::new(config);

    let synth = project
        .create_processor("Sine Synth", 0, None)
        .map_err(|e| e.to_string())?;
    project
        .create_processor("Gain", 0, None)
        .map_err(|e| e.to_string())?;
    project.create_track().map_err(|e| e.to_string())?;

    project.select_track(0, true, true).map_err(|e| e.to_string())?;
    project.copy_selected();
    project.set_focus(1, 0).map_err(|e| e.to_string())?;
    project.paste().map_err(|e| e.to_string())?;

    let state = project.state();
    if let (Some(from), Some(to)) = (
        state.processor_node_id(synth),
        state.audio_output_processor().and_then(|p| state.processor_node_id(p)),
    ) {
        project.begin_transaction("patch");
        project.connect(Connection::audio(from, 0, to, 1));
    }

    println!(
        "{} tracks, {} connections, undo: {}",
        project.state().num_tracks(),
        project.state().connections().len(),
        project.undo_manager().undo_description().unwrap_or("-")
    );
    project.undo();
    project.undo();
    project.redo();
    println!(
        "after undo/undo/redo: {} tracks, {} connections",
        project.state().num_tracks(),
        project.state().connections().len()
    );

    if let Some(path) = save_to {
        project.save(path).map_err(|e| e.to_string())?;
        println!("saved to {}", path.display());
    }
    print_project(&project)
}

fn run_dump(config: &Config, path: &Path) -> Result<(), String> {
    let project = Project::open(path, config, Box::new(DetachedGraph)).map_err(|e| e.to_string())?;
    print_project(&project)
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose" || a == "-v");
    init_logging(verbose);

    let config = match flag_value(&args, "--config") {
        Some(path) => Config::load_from(&path),
        None => Config::load(),
    };

    let command = args
        .iter()
        .skip(1)
        .position(|a| a == "demo" || a == "dump")
        .map(|i| i + 1);
    let result = match command.map(|i| (args[i].as_str(), i)) {
        Some(("demo", _)) => run_demo(&config, flag_value(&args, "--save").as_deref()),
        Some(("dump", i)) => match args.get(i + 1) {
            Some(path) => run_dump(&config, Path::new(path)),
            None => Err(USAGE.to_string()),
        },
        _ => Err(USAGE.to_string()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("strata: {}", e);
            ExitCode::FAILURE
        }
    }
}
