// Entry point and interactive CLI flow.
//
// - Option [1] loads the simulation report export and its collaborators,
//   printing load diagnostics.
// - Option [2] runs every QAQC check and the metrics pipeline, writes the
//   summary CSV plus the report and metrics JSON, and previews the summary.
// - A fatal run failure writes `qaqc_failure.json` instead of the report.
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use energy_qaqc::analysis::{run_analysis, LoadedInputs};
use energy_qaqc::config::AnalysisConfig;
use energy_qaqc::output::{self, RunFailure};
use energy_qaqc::util;

const CONFIG_ENV: &str = "QAQC_CONFIG";
const BACKTRACE_ENV: &str = "QAQC_ERROR_BACKTRACE";

// Inputs are loaded once and reused by every report generated in this session.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState { inputs: None }));

struct AppState {
    inputs: Option<LoadedInputs>,
}

fn read_choice() -> String {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        print!("Back to menu (Y/N): ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        io::stdin().read_line(&mut buf).ok();
        match buf.trim().to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn load_config() -> AnalysisConfig {
    let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| "qaqc_config.json".to_string());
    let config = match AnalysisConfig::load(&path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to read config {}: {}. Using defaults.\n", path, e);
            AnalysisConfig::default()
        }
    };
    let backtrace = config.error_backtrace || std::env::var_os(BACKTRACE_ENV).is_some();
    config.with_error_backtrace(backtrace)
}

fn handle_load(config: &AnalysisConfig) {
    match LoadedInputs::load(&config.inputs) {
        Ok(inputs) => {
            let r = &inputs.load_report;
            println!(
                "Loading simulation results... ({} rows read, {} cells loaded across {} tables)",
                util::format_int(r.total_rows as i64),
                util::format_int(r.loaded_cells as i64),
                util::format_int(inputs.store.table_count() as i64)
            );
            if r.rejected() > 0 {
                println!(
                    "Note: {} rows skipped ({} unparsable, {} incomplete, {} duplicate).",
                    util::format_int(r.rejected() as i64),
                    util::format_int(r.parse_errors as i64),
                    util::format_int(r.incomplete_rows as i64),
                    util::format_int(r.duplicate_cells as i64)
                );
            }
            println!("Building: {} ({} zones)\n", inputs.building.name, inputs.building.zones.len());
            match APP_STATE.lock() {
                Ok(mut state) => state.inputs = Some(inputs),
                Err(e) => eprintln!("Failed to store loaded inputs: {}\n", e),
            }
        }
        Err(e) => {
            eprintln!("Failed to load inputs: {}\n", e);
        }
    }
}

fn handle_generate(config: &AnalysisConfig) {
    let state = match APP_STATE.lock() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to read loaded inputs: {}\n", e);
            return;
        }
    };
    let Some(inputs) = state.inputs.as_ref() else {
        println!("Error: No simulation results loaded. Please load them first (option 1).\n");
        return;
    };

    let out_dir: PathBuf = config.inputs.output_dir.clone();
    println!("Running QAQC checks and metrics...\n");

    let run = match run_analysis(&inputs.inputs(config)) {
        Ok(run) => run,
        Err(e) => {
            error!(error = %e, "analysis run failed");
            let path = out_dir.join("qaqc_failure.json");
            if let Err(we) = output::write_json(&path, &RunFailure::from_error(&e)) {
                eprintln!("Write error: {}", we);
            }
            eprintln!("Analysis failed: {}\n(Failure details written to {})\n", e, path.display());
            return;
        }
    };

    let summary_path = out_dir.join("qaqc_summary.csv");
    if let Err(e) = output::write_csv(&summary_path, &run.report.summary_table) {
        eprintln!("Write error: {}", e);
    }
    let report_path = out_dir.join("qaqc_report.json");
    if let Err(e) = output::write_json(&report_path, &run) {
        eprintln!("Write error: {}", e);
    }
    let metrics_path = out_dir.join("metrics.json");
    if let Err(e) = output::write_json(&metrics_path, &run.metrics) {
        eprintln!("Write error: {}", e);
    }

    println!("QAQC Summary\n");
    output::preview_table_rows(&run.report.summary_table, run.report.summary_table.len());
    for table in &run.report.detail_tables {
        println!("{}\n", table.title);
        output::preview_table_rows(&table.rows, 5);
    }
    println!(
        "{} of {} checks flagged, {} flags total.",
        util::format_int(run.report.failing_checks() as i64),
        util::format_int(run.report.summary_table.len() as i64),
        util::format_int(run.report.total_flags as i64)
    );
    println!(
        "{} metrics computed ({} could not be calculated).",
        util::format_int(run.metrics.len() as i64),
        util::format_int(run.metrics.not_calculated() as i64)
    );
    println!(
        "(Outputs written to {}, {} and {})\n",
        summary_path.display(),
        report_path.display(),
        metrics_path.display()
    );
    info!(output_dir = %out_dir.display(), "outputs written");
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_config();
    loop {
        println!("Energy Simulation QAQC");
        println!("[1] Load simulation results");
        println!("[2] Generate QAQC report and metrics");
        println!("[3] Exit\n");
        match read_choice().as_str() {
            "1" => handle_load(&config),
            "2" => {
                println!();
                handle_generate(&config);
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            "3" => {
                println!("Exiting the program.");
                break;
            }
            _ => println!("Invalid choice. Please enter 1, 2 or 3.\n"),
        }
    }
}
