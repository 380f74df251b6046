//! lflplot binary: CLI parsing, path resolution, and loop wiring.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{debug, LevelFilter};

use lflplot::{
    app, plot::build_axis_traces, raw::FRAMES_PER_SUPERFRAME, LoopState, RawBackend,
    ReprocessOptions, Reprocessor, SeriesStore,
};

#[derive(Parser, Debug)]
#[command(
    name = "lflplot",
    version,
    about = "Watch an LFL frame definition and plot a raw flight-data recording"
)]
struct Args {
    /// LFL frame-definition file to watch. Prompted for when omitted.
    lfl_path: Option<PathBuf>,

    /// Raw flight-data recording to decode. Prompted for when omitted.
    data_path: Option<PathBuf>,

    /// Decoded series store. A temporary file is used when omitted.
    #[arg(short = 'o', long)]
    output_path: Option<PathBuf>,

    /// Superframes decoded between store flushes; -1 holds the whole
    /// recording in memory.
    #[arg(long, default_value_t = -1)]
    superframes_in_memory: i64,

    /// Treat the recording as frame doubled.
    #[arg(short = 'f', long)]
    frame_doubled: bool,

    /// Plot parameters whose definition changed on a dedicated axis.
    #[arg(long)]
    plot_changed: bool,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

/// A budget is either `-1` (unbounded) or a positive superframe count.
fn validate_memory_budget(budget: i64) -> Result<(), String> {
    if budget == 0 || budget < -1 {
        Err(format!(
            "--superframes-in-memory must be a positive superframe count or -1, got {budget}"
        ))
    } else {
        Ok(())
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).init();
}

/// Resolve a path from the CLI or fall back to a file-picker dialog.
fn resolve_path(
    cli: Option<PathBuf>,
    title: &str,
    filter_name: &str,
    extensions: &[&str],
) -> Option<PathBuf> {
    if let Some(path) = cli {
        return Some(path);
    }
    let mut dialog = rfd::FileDialog::new().set_title(title);
    if !extensions.is_empty() {
        dialog = dialog.add_filter(filter_name, extensions);
    }
    dialog = dialog.add_filter("All Files", &["*"]);
    dialog.pick_file()
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(message) = validate_memory_budget(args.superframes_in_memory) {
        eprintln!("{message}");
        return ExitCode::FAILURE;
    }

    let Some(lfl_path) = resolve_path(
        args.lfl_path,
        "Select the LFL frame definition",
        "LFL files",
        &["lfl"],
    ) else {
        app::show_error_dialog("No LFL file!", "An LFL frame definition is required.");
        return ExitCode::FAILURE;
    };
    let Some(data_path) = resolve_path(
        args.data_path,
        "Select the raw flight-data recording",
        "Raw recordings",
        &["dat", "COP"],
    ) else {
        app::show_error_dialog("No data file!", "A raw flight-data recording is required.");
        return ExitCode::FAILURE;
    };

    for path in [&lfl_path, &data_path] {
        if !path.is_file() {
            eprintln!("no such file: {}", path.display());
            return ExitCode::FAILURE;
        }
    }

    // Keep the handle alive for the lifetime of the loops; the store file
    // is removed again on clean exit.
    let mut temp_store = None;
    let output_path = match args.output_path {
        Some(path) => path,
        None => {
            let file = match tempfile::NamedTempFile::with_suffix(".json") {
                Ok(file) => file,
                Err(err) => {
                    eprintln!("cannot create temporary series store: {err}");
                    return ExitCode::FAILURE;
                }
            };
            let path = file.path().to_path_buf();
            temp_store = Some(file);
            path
        }
    };
    debug!(
        "watching {} against {} ({} frames per superframe)",
        lfl_path.display(),
        data_path.display(),
        FRAMES_PER_SUPERFRAME
    );

    let opts = ReprocessOptions {
        lfl_path: lfl_path.clone(),
        data_path,
        output_path: output_path.clone(),
        memory_budget: args.superframes_in_memory,
        frame_doubled: args.frame_doubled,
        plot_changed: args.plot_changed,
    };
    let mut reprocessor = Reprocessor::new(RawBackend, opts);

    let state = LoopState::new();
    let watcher = {
        let state = state.clone();
        std::thread::Builder::new()
            .name("lfl-watch".into())
            .spawn(move || {
                lflplot::watch_loop(&lfl_path, &state, || reprocessor.run());
            })
            .expect("failed to spawn watch thread")
    };

    let backend = RawBackend;
    let window = app::run(
        state.clone(),
        Box::new(move |assignment| {
            let series = backend.open(&output_path)?;
            build_axis_traces(assignment, &series)
        }),
    );

    // Whether the window closed cleanly or fell over, wind the watcher down
    // and remove the temporary store before reporting.
    state.request_exit();
    let _ = watcher.join();
    drop(temp_store);
    match window {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
