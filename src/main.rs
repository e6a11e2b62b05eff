use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use forecast_console::{
    ConsoleLoadingIndicator, ExportController, ForecastApiClient, ForecastForm, Mode,
    ModeController, Notifier, RangeDisplay, RequestOrchestrator, SubmitOutcome, UploadFile,
    config::AppConfig, format_mae, request::parse_picker,
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(name = "forecast-console")]
#[command(about = "Submit forecasting jobs and render predicted vs. actual users")]
struct Args {
    /// Backend base URL (overrides configuration)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Directory for exported files
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Forecast from an uploaded data file
    Upload {
        file: PathBuf,
        #[command(flatten)]
        forecast: ForecastArgs,
    },
    /// Forecast from data stored in the backend database
    Range {
        /// Window start, local time (YYYY-MM-DDTHH:MM). Defaults to 24h before the latest data.
        #[arg(long)]
        start: Option<String>,
        /// Window stop, local time (YYYY-MM-DDTHH:MM). Defaults to the latest data.
        #[arg(long)]
        stop: Option<String>,
        #[command(flatten)]
        forecast: ForecastArgs,
    },
    /// Show the range of data stored in the backend database
    DataRange,
}

#[derive(clap::Args, Debug)]
struct ForecastArgs {
    /// Number of hours to forecast
    #[arg(long)]
    forecast_hours: Option<String>,
    /// Comma-separated look-back window sizes
    #[arg(long)]
    window_sizes: Option<String>,
    /// Save the prediction as prediction.csv
    #[arg(long)]
    csv: bool,
    /// Save the chart as forecast_chart.png
    #[arg(long)]
    chart: bool,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
        .parse_lossy("forecast_console=debug");

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let mut config = AppConfig::load().context("Failed to load configuration")?;
    if let Some(base_url) = args.base_url {
        config.server.base_url = base_url;
    }
    if let Some(output_dir) = args.output_dir {
        config.export.output_dir = Some(output_dir);
    }

    let client = ForecastApiClient::new(config.server.base_url.clone(), &config.network)?;
    tracing::info!("Using forecasting backend at {}", client.base_url());

    let rt = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;

    match args.command {
        Command::DataRange => rt.block_on(show_data_range(&client)),
        Command::Upload { file, forecast } => {
            let upload = UploadFile::read(&file)
                .with_context(|| format!("Failed to open {}", file.display()))?;
            run_forecast(&rt, &config, client, Mode::FileUpload, forecast, |form| {
                form.file = Some(upload);
                Ok(())
            })
        }
        Command::Range {
            start,
            stop,
            forecast,
        } => run_forecast(&rt, &config, client, Mode::DatabaseRange, forecast, |form| {
            // Explicit values override the pre-filled window
            if let Some(start) = start {
                form.start_time = Some(parse_picker(&start)?);
            }
            if let Some(stop) = stop {
                form.stop_time = Some(parse_picker(&stop)?);
            }
            Ok(())
        }),
    }
}

fn notifier() -> Arc<dyn Notifier> {
    #[cfg(feature = "desktop")]
    {
        Arc::new(forecast_console::SystemNotifier)
    }
    #[cfg(not(feature = "desktop"))]
    {
        Arc::new(forecast_console::ConsoleNotifier)
    }
}

async fn show_data_range(client: &ForecastApiClient) -> Result<ExitCode> {
    let mut controller = ModeController::new(Local);
    let mut form = ForecastForm::default();
    controller
        .select(Mode::DatabaseRange, client, &mut form)
        .await;

    match controller.range_display() {
        RangeDisplay::Available(text) => {
            println!("{}", text);
            Ok(ExitCode::SUCCESS)
        }
        RangeDisplay::Failed(text) => {
            eprintln!("{}", text);
            Ok(ExitCode::FAILURE)
        }
        RangeDisplay::Hidden => Ok(ExitCode::SUCCESS),
    }
}

fn run_forecast(
    rt: &tokio::runtime::Runtime,
    config: &AppConfig,
    client: ForecastApiClient,
    mode: Mode,
    forecast: ForecastArgs,
    fill_form: impl FnOnce(&mut ForecastForm) -> Result<(), forecast_console::ForecastError>,
) -> Result<ExitCode> {
    let notifier = notifier();
    let orchestrator =
        RequestOrchestrator::new(client, Arc::clone(&notifier), Arc::new(ConsoleLoadingIndicator));
    let exporter = ExportController::new(orchestrator.render_state(), notifier, &config.export);

    let mut form = ForecastForm::new(&config.forecast);
    if let Some(hours) = forecast.forecast_hours {
        form.forecast_hours = hours;
    }
    if let Some(sizes) = forecast.window_sizes {
        form.window_sizes = sizes;
    }

    let mut controller = ModeController::new(Local);
    let outcome = rt.block_on(async {
        controller
            .select(mode, orchestrator.client(), &mut form)
            .await;
        match controller.range_display() {
            RangeDisplay::Available(text) => println!("{}", text),
            RangeDisplay::Failed(text) => eprintln!("{}", text),
            RangeDisplay::Hidden => {}
        }

        fill_form(&mut form)?;
        Ok::<_, anyhow::Error>(orchestrator.submit(mode, &form, controller.zone()).await)
    })?;

    let state = orchestrator.render_state();
    if let Some(table) = state
        .lock()
        .map_err(|_| anyhow::anyhow!("Render state poisoned"))?
        .table()
    {
        println!("{}", table.to_text());
    }

    match outcome {
        SubmitOutcome::Rendered { mae, .. } | SubmitOutcome::Empty { mae } => {
            println!("{}", format_mae(mae))
        }
        SubmitOutcome::Failed(_) => return Ok(ExitCode::FAILURE),
    }

    let mut exit = ExitCode::SUCCESS;
    if forecast.csv {
        match exporter.export_csv() {
            Ok(path) => println!("Saved {}", path.display()),
            Err(e) => {
                tracing::error!("CSV export failed: {}", e);
                exit = ExitCode::FAILURE;
            }
        }
    }
    if forecast.chart {
        match exporter.export_chart() {
            Ok(path) => println!("Saved {}", path.display()),
            Err(e) => {
                tracing::error!("Chart export failed: {}", e);
                exit = ExitCode::FAILURE;
            }
        }
    }

    Ok(exit)
}
