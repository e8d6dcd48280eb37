use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{CommandFactory, Parser};

use ego::diagnostics::{render_error, CompileError};
use ego::manifest::{self, Config};

#[derive(Parser)]
#[command(
    name = "ego",
    version,
    about = "Expand Go try expressions (`expr?`) into explicit error checks",
    after_help = "Examples:\n  ego file1.ego file2.ego    # Transpile specific files\n  ego ./folder               # Transpile all .ego files in folder\n  ego ./...                  # Transpile all .ego files recursively\n  ego < in.ego > out.go      # Transpile stdin to stdout"
)]
struct Cli {
    /// Source files, directories, or recursive patterns (`dir/...`)
    paths: Vec<PathBuf>,

    /// Transpile without writing any output
    #[arg(long)]
    check: bool,

    /// Print results to stdout instead of writing files
    #[arg(long, conflicts_with = "check")]
    stdout: bool,

    /// Path to an ego.toml (defaults to ./ego.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log every rewrite
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Write,
    Check,
    Stdout,
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config = match manifest::load(cli.config.as_deref(), &cwd) {
        Ok(config) => config,
        Err(err) => {
            render_error("", manifest::MANIFEST_NAME, &err);
            return ExitCode::FAILURE;
        }
    };

    let mode = if cli.check {
        Mode::Check
    } else if cli.stdout {
        Mode::Stdout
    } else {
        Mode::Write
    };

    if cli.paths.is_empty() {
        if std::io::stdin().is_terminal() {
            // Nothing piped in: show usage and exit cleanly.
            let _ = Cli::command().print_help();
            return ExitCode::SUCCESS;
        }
        return run_stdin(&config, mode);
    }

    for arg in &cli.paths {
        let files = match collect_sources(arg, &config) {
            Ok(files) => files,
            Err(err) => {
                render_error("", &arg.display().to_string(), &err);
                return ExitCode::FAILURE;
            }
        };
        for file in files {
            if !transpile_file(&file, &config, mode) {
                return ExitCode::FAILURE;
            }
        }
    }
    ExitCode::SUCCESS
}

fn run_stdin(config: &Config, mode: Mode) -> ExitCode {
    let stdin = std::io::stdin().lock();
    let result = match mode {
        Mode::Check => ego::transpile_io_with(stdin, std::io::sink(), &config.transpile),
        Mode::Write | Mode::Stdout => {
            ego::transpile_io_with(stdin, std::io::stdout().lock(), &config.transpile)
        }
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // The source is consumed by now; report without a code frame.
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

// ---- Path discovery ----

/// Expand one command-line argument into the source files it names, in a
/// stable order.
fn collect_sources(arg: &Path, config: &Config) -> Result<Vec<PathBuf>, CompileError> {
    let text = arg.to_string_lossy();
    if let Some(base) = recursive_base(&text) {
        let mut files = Vec::new();
        walk_recursive(&base, config, &mut files)?;
        if files.is_empty() {
            tracing::warn!(path = %base.display(), "no .{} files found", config.source_extension);
        }
        return Ok(files);
    }

    let meta = std::fs::metadata(arg)
        .map_err(|e| CompileError::io(format!("could not access '{}': {e}", arg.display()), arg.to_path_buf()))?;

    if meta.is_dir() {
        let files: Vec<PathBuf> = read_dir_sorted(arg)?
            .into_iter()
            .filter(|p| p.is_file() && config.is_source(p))
            .collect();
        if files.is_empty() {
            tracing::warn!(path = %arg.display(), "no .{} files found", config.source_extension);
        }
        return Ok(files);
    }

    if !config.is_source(arg) {
        return Err(CompileError::io(
            format!("file must have .{} extension: {}", config.source_extension, arg.display()),
            arg.to_path_buf(),
        ));
    }
    Ok(vec![arg.to_path_buf()])
}

/// `...` -> `.`, `dir/...` -> `dir`; `None` for ordinary paths.
fn recursive_base(text: &str) -> Option<PathBuf> {
    if text == "..." {
        return Some(PathBuf::from("."));
    }
    text.strip_suffix("/...")
        .or_else(|| text.strip_suffix("\\..."))
        .map(|base| PathBuf::from(if base.is_empty() { "/" } else { base }))
}

fn read_dir_sorted(dir: &Path) -> Result<Vec<PathBuf>, CompileError> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        CompileError::io(format!("could not read directory '{}': {e}", dir.display()), dir.to_path_buf())
    })?;
    let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok()).map(|e| e.path()).collect();
    paths.sort();
    Ok(paths)
}

fn walk_recursive(dir: &Path, config: &Config, out: &mut Vec<PathBuf>) -> Result<(), CompileError> {
    for path in read_dir_sorted(dir)? {
        let Ok(file_type) = std::fs::symlink_metadata(&path).map(|m| m.file_type()) else {
            tracing::warn!(path = %path.display(), "skipping unreadable entry");
            continue;
        };
        if file_type.is_dir() {
            walk_recursive(&path, config, out)?;
        } else if file_type.is_symlink() {
            tracing::warn!(path = %path.display(), "skipping symlink");
        } else if config.is_source(&path) {
            out.push(path);
        }
    }
    Ok(())
}

// ---- Per-file work ----

/// Returns `false` after reporting a failure.
fn transpile_file(input: &Path, config: &Config, mode: Mode) -> bool {
    let filename = input.display().to_string();
    let source = match std::fs::read_to_string(input) {
        Ok(source) => source,
        Err(e) => {
            let err = CompileError::io(format!("failed to read input file: {e}"), input.to_path_buf());
            render_error("", &filename, &err);
            return false;
        }
    };

    let output = match ego::transpile_with(&source, &config.transpile) {
        Ok(output) => output,
        Err(err) => {
            render_error(&source, &filename, &err);
            return false;
        }
    };

    match mode {
        Mode::Check => {
            tracing::info!(file = %filename, "ok");
        }
        Mode::Stdout => print!("{output}"),
        Mode::Write => {
            let output_path = config.output_path(input);
            if let Err(e) = std::fs::write(&output_path, output) {
                let err = CompileError::io(
                    format!("failed to write output file: {e}"),
                    output_path.clone(),
                );
                render_error("", &filename, &err);
                return false;
            }
            tracing::info!(input = %filename, output = %output_path.display(), "transpiled");
            println!("Transpiled: {} -> {}", input.display(), output_path.display());
        }
    }
    true
}
