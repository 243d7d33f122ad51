use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::Result;
use color_eyre::eyre::eyre;
use std::path::PathBuf;
use surveyprep::config::Config;
use surveyprep::core::{
    AnalysisResult, CleanRequest, ConfigPatch, DatasetId, DatasetSession, ImputationMethod,
    OutlierMethod, PreviewOutcome, SessionView,
};
use surveyprep::{HttpDatasetService, Intent, IntentOutcome, UploadFile, WorkflowController};
use tracing::{error, info};

/// Upload, clean, analyze and report on survey files through the survey service
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log level for the file log (RUST_LOG still refines it)
    #[arg(long = "logging", value_enum, global = true)]
    logging: Option<LogLevel>,
    /// Path to a config file (overrides default config discovery)
    #[arg(long = "config", value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Service base URL (overrides config and SURVEYPREP_API_BASE)
    #[arg(long = "api-base", value_name = "URL", global = true)]
    api_base: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the service is reachable
    Status,
    /// Upload a file and take it through cleaning, analysis and report
    Run {
        /// CSV or Excel file to upload
        file: PathBuf,
        #[arg(long)]
        imputation: Option<ImputationMethod>,
        #[arg(long)]
        outliers: Option<OutlierMethod>,
        /// Weight column for analysis (unweighted when omitted)
        #[arg(long)]
        weight: Option<String>,
        /// Stop after the first preview
        #[arg(long)]
        no_clean: bool,
        #[arg(long)]
        no_analyze: bool,
    },
    /// Show the current preview of an uploaded dataset
    Preview {
        #[arg(long)]
        dataset: String,
    },
    /// Clean an uploaded dataset and show the new preview
    Clean {
        #[arg(long)]
        dataset: String,
        #[arg(long)]
        imputation: Option<ImputationMethod>,
        #[arg(long)]
        outliers: Option<OutlierMethod>,
    },
    /// Analyze an uploaded dataset
    Analyze {
        #[arg(long)]
        dataset: String,
        #[arg(long)]
        weight: Option<String>,
        /// Print the full analysis result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the report URL of an uploaded dataset
    Report {
        #[arg(long)]
        dataset: String,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_tracing(self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

type Controller = WorkflowController<HttpDatasetService>;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    surveyprep::logging::init_with(None, args.logging.map(LogLevel::as_tracing))?;

    let mut cfg = Config::from_path(args.config.as_ref())?;
    if let Some(base) = args.api_base {
        cfg.api.base_url = base;
    }
    info!("using service at {}", cfg.api.base_url);
    let service = HttpDatasetService::new(cfg.api.base_url.clone(), &cfg.api.user_agent)?;

    let res = run_command(args.command, service, &cfg).await;
    if let Err(e) = &res {
        error!("Error: {e}");
    }
    res
}

async fn run_command(command: Command, service: HttpDatasetService, cfg: &Config) -> Result<()> {
    let max_rows = cfg.preview.max_rows;
    match command {
        Command::Status => {
            let controller = Controller::new(service);
            let health = controller.ping().await?;
            println!("{}: {} {}", cfg.api.base_url, health.status, health.message);
        }
        Command::Run {
            file,
            imputation,
            outliers,
            weight,
            no_clean,
            no_analyze,
        } => {
            let controller = Controller::with_session(
                service,
                DatasetSession::with_config(cfg.cleaning.clone()),
            );
            let patch = ConfigPatch {
                imputation_method: imputation,
                outlier_method: outliers,
                weight_column: weight.map(Some),
            };
            if !patch.is_empty() {
                controller.dispatch(Intent::Configure(patch)).await?;
            }

            let upload = UploadFile::from_path(&file)?;
            controller.dispatch(Intent::Upload(upload)).await?;
            print_view(&controller.snapshot(), max_rows);

            if !no_clean {
                if let IntentOutcome::Cleaned(outcome) = controller.dispatch(Intent::RunClean).await? {
                    print_clean_logs(&outcome.report.logs);
                    print_preview_outcome(outcome.preview);
                }
                print_view(&controller.snapshot(), max_rows);
            }

            if !no_analyze {
                if let IntentOutcome::Analyzed(result) = controller.dispatch(Intent::RunAnalyze).await? {
                    print_analysis(&result);
                }
            }

            if let IntentOutcome::ReportUrl(url) = controller.dispatch(Intent::OpenReport).await? {
                println!("Report: {url}");
            }
        }
        Command::Preview { dataset } => {
            let controller = attach(service, &dataset, cfg)?;
            controller.refresh_preview().await?;
            print_view(&controller.snapshot(), max_rows);
        }
        Command::Clean {
            dataset,
            imputation,
            outliers,
        } => {
            let controller = attach(service, &dataset, cfg)?;
            let defaults = cfg.cleaning.clean_request();
            let request = CleanRequest {
                imputation_method: imputation.unwrap_or(defaults.imputation_method),
                outlier_method: outliers.unwrap_or(defaults.outlier_method),
            };
            let outcome = controller.run_clean(request).await?;
            print_clean_logs(&outcome.report.logs);
            print_view(&controller.snapshot(), max_rows);
        }
        Command::Analyze {
            dataset,
            weight,
            json,
        } => {
            let controller = attach(service, &dataset, cfg)?;
            let result = controller
                .run_analyze(weight.as_deref().unwrap_or(""))
                .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(result.as_value())?);
            } else {
                print_analysis(&result);
            }
        }
        Command::Report { dataset } => {
            let controller = attach(service, &dataset, cfg)?;
            println!("{}", controller.report_url()?);
        }
    }
    Ok(())
}

/// Controller for a dataset uploaded by an earlier invocation
fn attach(service: HttpDatasetService, dataset: &str, cfg: &Config) -> Result<Controller> {
    let id = DatasetId::new(dataset).map_err(|e| eyre!("--dataset: {e}"))?;
    let mut session = DatasetSession::attached(id);
    session.set_config(ConfigPatch {
        imputation_method: Some(cfg.cleaning.imputation_method),
        outlier_method: Some(cfg.cleaning.outlier_method),
        weight_column: Some(cfg.cleaning.weight_column.clone()),
    });
    Ok(Controller::with_session(service, session))
}

fn print_view(view: &SessionView, max_rows: usize) {
    let dataset = view
        .dataset_id
        .as_ref()
        .map(|d| d.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!("Dataset {dataset} [{}]", view.stage);
    println!(
        "  imputation: {}  outliers: {}  weight: {}",
        view.config.imputation_method.display_name(),
        view.config.outlier_method.display_name(),
        view.config.weight_column.as_deref().unwrap_or("None"),
    );

    let Some(preview) = &view.preview else {
        println!("  (no preview)");
        return;
    };
    println!(
        "Preview ({} rows, {} columns)",
        preview.row_count, preview.column_count
    );

    let rows: Vec<Vec<String>> = preview
        .rows
        .iter()
        .take(max_rows)
        .map(|row| {
            preview
                .columns
                .iter()
                .map(|c| row.get(c).map(|v| truncate(&v.to_string())).unwrap_or_default())
                .collect()
        })
        .collect();
    let widths: Vec<usize> = preview
        .columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            rows.iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(truncate(c).chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let header: Vec<String> = preview.columns.iter().map(|c| truncate(c)).collect();
    println!("  {}", format_row(&header, &widths));
    println!(
        "  {}",
        widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-+-")
    );
    for row in &rows {
        println!("  {}", format_row(row, &widths));
    }
}

const MAX_CELL_WIDTH: usize = 24;

fn truncate(s: &str) -> String {
    if s.chars().count() <= MAX_CELL_WIDTH {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(MAX_CELL_WIDTH - 1).collect();
        out.push('…');
        out
    }
}

fn format_row(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, w)| format!("{cell:<w$}", w = *w))
        .collect::<Vec<_>>()
        .join(" | ")
}

fn print_clean_logs(logs: &[String]) {
    for line in logs {
        println!("  clean: {line}");
    }
}

fn print_preview_outcome(outcome: PreviewOutcome) {
    if outcome == PreviewOutcome::Superseded {
        println!("  (preview superseded by a newer request)");
    }
}

fn print_analysis(result: &AnalysisResult) {
    println!("Analysis");
    if let Some(n) = result.n() {
        println!("  n: {n}");
    }
    if let Some(n_eff) = result.effective_n() {
        println!("  effective n: {n_eff:.1}");
    }
    println!("  weight column: {}", result.weight_column().unwrap_or("none"));
    let numeric = result.numeric_columns();
    if !numeric.is_empty() {
        println!("  numeric: {}", numeric.join(", "));
    }
    let categorical = result.categorical_columns();
    if !categorical.is_empty() {
        println!("  categorical: {}", categorical.join(", "));
    }
}
