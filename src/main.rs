use chrono::Local;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use windscope::config::{Config, SERVICE_URL_ENV};
use windscope::{
    report, AttachmentSelector, FailureKind, FileHandle, HttpTransport, PipelineState,
    SelectionError, SubmissionController,
};

#[derive(Parser, Debug)]
#[command(name = "windscope")]
#[command(author, version, about = "Send a wind-plant dataset to the analysis service and report the results")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Dataset to analyze (CSV, JSON or Excel; optional in GUI mode)
    path: Option<PathBuf>,

    /// Launch GUI file picker (auto-enabled when double-clicked)
    #[arg(long)]
    gui: bool,

    /// Output report file (.html, .json, .csv)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory for auto-generated reports (default from config: windscope-reports)
    #[arg(long)]
    report_dir: Option<PathBuf>,

    /// Don't auto-generate an HTML report
    #[arg(long)]
    no_report: bool,

    /// Don't prompt to open report
    #[arg(long)]
    no_open: bool,

    /// Analysis service base URL
    #[arg(long, env = SERVICE_URL_ENV)]
    service_url: Option<String>,

    /// Config file (default: ./windscope.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Show detailed output and debug logs
    #[arg(short, long)]
    verbose: bool,

    /// Only show summary
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start interactive web UI with a drag-and-drop upload
    Serve {
        /// Port to listen on (default from config: 3001)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

fn init_logging(default: Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default.as_str().to_lowercase()));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    let args = Args::parse();

    let default_level = match (&args.command, args.verbose) {
        (_, true) => Level::DEBUG,
        (Some(Command::Serve { .. }), false) => Level::INFO,
        (None, false) => Level::WARN,
    };
    init_logging(default_level);

    let mut config = match Config::load(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(url) = args.service_url.clone() {
        config.service.base_url = url;
    }
    if let Some(dir) = args.report_dir.clone() {
        config.report.dir = dir;
    }

    let service_url = match config.service_url() {
        Ok(u) => u,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    // Handle subcommands first
    if let Some(Command::Serve { port }) = args.command {
        let port = port.unwrap_or(config.serve.port);
        if let Err(e) = windscope::serve::start(port, &service_url) {
            eprintln!("Server error: {}", e);
            std::process::exit(1);
        }
        return;
    }

    // Determine if we should use GUI mode
    // With GUI feature: launch GUI if --gui flag OR no path provided
    #[cfg(feature = "gui")]
    let use_gui = args.gui || args.path.is_none();

    #[cfg(not(feature = "gui"))]
    let use_gui = false;

    #[cfg(feature = "gui")]
    let handle = if use_gui {
        pick_file_gui().map(FileHandle::Path)
    } else {
        args.path.clone().map(FileHandle::Path)
    };

    #[cfg(not(feature = "gui"))]
    let handle = if let Some(p) = args.path.clone() {
        Some(FileHandle::Path(p))
    } else {
        eprintln!("Usage: windscope <PATH>");
        eprintln!("Run 'windscope --help' for more options.");
        eprintln!("Note: GUI mode not available in this build.");
        std::process::exit(1);
    };

    let mut controller = SubmissionController::new();
    let mut selector = AttachmentSelector::new();

    match selector.select_from_browse(handle, &mut controller) {
        Ok(()) => {}
        Err(SelectionError::InvalidAttachment) => {
            // User cancelled - show message and exit
            eprintln!("No file selected.");
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }

    let transport = match HttpTransport::new(&service_url) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    if !args.quiet {
        if let Some(attachment) = controller.attachment() {
            eprintln!("\x1b[1mWindscope - Wind Plant Analysis\x1b[0m");
            eprintln!("{}", "─".repeat(70));
            eprintln!("Dataset:  {} ({})", attachment.name(), attachment.size_label());
            eprintln!("Service:  {}\n", transport.endpoint());
        }
    }

    // Spinner while the request is in flight
    let pb = if !args.quiet {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message("Processing data...");
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    let state = match runtime.block_on(controller.submit(&transport)) {
        Ok(state) => state.clone(),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let result = match state {
        PipelineState::Succeeded(result) => result,
        PipelineState::Failed(detail) => {
            eprintln!("\x1b[31m✗ Analysis Failed:\x1b[0m {}", detail.reason);
            if args.verbose {
                if let Some(cause) = &detail.cause {
                    eprintln!("    Cause: {}", cause);
                }
            }
            std::process::exit(match detail.kind {
                FailureKind::Application => 2,
                FailureKind::Transport => 1,
            });
        }
        other => {
            eprintln!("Unexpected pipeline state: {}", other.name());
            std::process::exit(1);
        }
    };

    let view = report::project(&result);

    if !args.quiet {
        eprintln!("\x1b[32m✓ Analysis Complete\x1b[0m\n");
        for card in &view.cards {
            println!("  {:<18} {:>14}", card.title, card.display());
        }

        if !view.ranking.is_empty() {
            println!("\n  {:<6} {:<20} {:>12}", "RANK", "TURBINE", "ENERGY");
            for t in &view.ranking {
                println!("  {:<6} {:<20} {:>12}", t.rank, truncate(&t.turbine_id, 20), t.energy);
            }
        }

        if args.verbose {
            eprintln!(
                "\n    Series: {} monthly points, {} power-curve points, {} turbines reported",
                view.monthly_production.len(),
                view.power_curve.len(),
                result.turbine_performance.len()
            );
        }
    } else {
        println!("{}", view.summary_line());
    }

    // Determine report path
    let report_path = if let Some(ref output) = args.output {
        Some(output.clone())
    } else if !args.no_report {
        // Auto-generate report
        std::fs::create_dir_all(&config.report.dir).ok();
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let filename = format!("windscope_report_{}.html", timestamp);
        Some(config.report.dir.join(filename))
    } else {
        None
    };

    // Generate report
    if let Some(ref output_path) = report_path {
        if let Err(e) = report::generate(output_path, &view) {
            eprintln!("Failed to write report: {}", e);
            std::process::exit(1);
        }
        if !args.quiet {
            eprintln!("\n\x1b[32mReport saved: {}\x1b[0m", output_path.display());
        }

        // Open report
        if !args.no_open {
            if use_gui {
                // In GUI mode, auto-open the report (no prompt)
                let _ = open::that(output_path);
            } else if !args.quiet {
                // In terminal mode, ask first
                eprint!("\nOpen report in browser? [Y/n] ");
                io::stderr().flush().ok();

                let mut input = String::new();
                if io::stdin().read_line(&mut input).is_ok() {
                    let input = input.trim().to_lowercase();
                    if input.is_empty() || input == "y" || input == "yes" {
                        if let Err(e) = open::that(output_path) {
                            eprintln!("Failed to open report: {}", e);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(feature = "gui")]
fn pick_file_gui() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .set_title("Select wind plant dataset to analyze")
        .add_filter("Datasets", &["csv", "json", "xlsx", "xls"])
        .pick_file()
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}
