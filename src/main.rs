// Entry point and CLI flow.
//
// Batch mode (default) loads the CSV, builds every market table and writes
// the sheets in one go. `--interactive` keeps the menu:
// - [1] loads and cleans the CSV, printing diagnostics,
// - [2] builds and writes the report, then offers to go back to the menu.
use clap::Parser;
use hfc_report::loader::{self, LoadReport};
use hfc_report::output;
use hfc_report::reports::{self, BuildOptions};
use hfc_report::util;
use hfc_report::{Record, ReportConfig, Result};
use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hfc_report")]
#[command(about = "Per-market HFC change explanation report")]
struct Args {
    /// Contract-level CSV export
    #[arg(short, long, default_value = "q2_input.csv")]
    input: PathBuf,

    /// JSON run configuration (columns, effects, thresholds)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory receiving one CSV per sheet plus summary.json
    #[arg(short, long, default_value = "report")]
    out_dir: PathBuf,

    /// Menu-driven mode
    #[arg(long)]
    interactive: bool,
}

// Loaded once, reported on as many times as the user asks.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState { data: None }));

struct AppState {
    data: Option<(Vec<Record>, LoadReport)>,
}

fn read_choice() -> String {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Returns `true` for `Y`, `false` for `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        print!("Back to Report Selection (Y/N): ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        if io::stdin().read_line(&mut buf).unwrap_or(0) == 0 {
            return false;
        }
        match buf.trim().to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn handle_load(args: &Args, cfg: &ReportConfig) -> Result<()> {
    let (data, load_report) = loader::load_and_clean(&args.input, cfg)?;
    println!(
        "Processing dataset... ({} rows loaded from {})",
        util::format_int(load_report.total_rows),
        args.input.display()
    );
    if load_report.unparsed_amounts > 0 {
        println!(
            "Note: {} money cells were not numeric and were treated as missing.",
            util::format_int(load_report.unparsed_amounts)
        );
    }
    if load_report.change_mismatches > 0 {
        println!(
            "Note: {} rows have a change that differs from current - prior.",
            util::format_int(load_report.change_mismatches)
        );
    }
    println!();
    APP_STATE
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .data = Some((data, load_report));
    Ok(())
}

fn handle_generate_reports(args: &Args, cfg: &ReportConfig) -> Result<()> {
    let state = APP_STATE.lock().unwrap_or_else(PoisonError::into_inner);
    let Some((data, load_report)) = state.data.as_ref() else {
        println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
        return Ok(());
    };

    let opts = BuildOptions::from_config(cfg);
    let report = reports::build_market_report(data, reports::entry_type_filter(cfg), &opts);
    let files = output::write_report(&args.out_dir, &report)?;

    let summary = reports::generate_summary(load_report.total_rows, &report, &opts.period);
    let summary_path = args.out_dir.join("summary.json");
    output::write_json(&summary_path, &summary)?;

    println!(
        "Generated {} sheets for {} markets ({} {}).\n",
        files.len(),
        report.markets.len(),
        opts.period.quarter,
        opts.period.year
    );
    output::preview_table(
        "Market Summary",
        Some("amounts in m€"),
        &report.summary_rows(),
        report.markets.len(),
    );
    output::preview_table(
        "Top Positive HFC Changes",
        Some(format!("top {} across filtered records", cfg.top_n).as_str()),
        &report.top_positive,
        5,
    );
    output::preview_table(
        "Top Negative HFC Changes",
        Some(format!("top {} across filtered records", cfg.top_n).as_str()),
        &report.top_negative,
        5,
    );
    if !summary.degenerate_markets.is_empty() {
        println!(
            "Markets with no change to rank: {}\n",
            summary.degenerate_markets.join(", ")
        );
    }
    println!(
        "Total HFC change: {} m€ (sheets saved to {})\n",
        util::format_number(summary.total_change_m, 2),
        args.out_dir.display()
    );
    Ok(())
}

fn run_interactive(args: &Args, cfg: &ReportConfig) {
    loop {
        println!("[1] Load the file");
        println!("[2] Generate Reports\n");
        match read_choice().as_str() {
            "1" => {
                if let Err(e) = handle_load(args, cfg) {
                    eprintln!("Failed to load file: {}\n", e);
                }
            }
            "2" => {
                println!();
                if let Err(e) = handle_generate_reports(args, cfg) {
                    eprintln!("Failed to generate reports: {}\n", e);
                }
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            "" => break,
            _ => println!("Invalid choice. Please enter 1 or 2.\n"),
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let cfg = match &args.config {
        Some(path) => ReportConfig::load(path),
        None => Ok(ReportConfig::default()),
    };
    let cfg = match cfg {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    };
    info!(input = %args.input.display(), out_dir = %args.out_dir.display(), "starting");

    if args.interactive {
        run_interactive(&args, &cfg);
        return;
    }

    let result = handle_load(&args, &cfg).and_then(|_| handle_generate_reports(&args, &cfg));
    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}
