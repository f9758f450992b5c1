//! Command-line front end.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};

use crate::camera::{CameraDevice, FrameFileCamera, NoCamera};
use crate::config::{self, DeviceSettings};
use crate::controls::{Controls, PumpAction};
use crate::dashboard::{Dashboard, RoofView, WaterView};
use crate::device::{DeviceApi, HttpDeviceClient};
use crate::error::{AppError, AppResult};
use crate::notification;
use crate::poller::{PollerHandle, StatusPoller};
use crate::storage::PreviewStore;
use crate::theme::{AccentColor, AccentStore, FilePreferenceStore, ThemeMode};
use crate::workflow::{CaptureAnalysisWorkflow, WorkflowState};

const PREVIEW_MAX_AGE_HOURS: u64 = 24;
const CAMERA_READY_ATTEMPTS: u32 = 50;
const CAMERA_READY_POLL: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
#[command(name = "smartfarm", version, about = "Greenhouse monitoring and control client")]
pub struct Cli {
    /// Device base URL (overrides SMARTFARM_PI_URL and config.json)
    #[arg(long, global = true)]
    pub device_url: Option<String>,

    /// Debug logging when RUST_LOG is unset
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch one status snapshot
    Status {
        /// Print the raw record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Poll continuously until Ctrl-C
    Watch,
    /// Leaf disease analysis
    Leaf {
        #[command(subcommand)]
        action: LeafCommand,
    },
    /// Roof control through the rain override
    Roof {
        #[command(subcommand)]
        action: RoofCommand,
    },
    /// Irrigation control
    Water {
        #[command(subcommand)]
        action: WaterCommand,
    },
    /// Show or set the accent color
    Accent { color: Option<String> },
    /// Show or set the theme mode
    Theme { mode: Option<String> },
}

#[derive(Subcommand, Debug)]
pub enum LeafCommand {
    /// Analyze an image file
    Upload { path: PathBuf },
    /// Capture from a frame file kept fresh by an external grabber, then analyze
    Camera {
        #[arg(long)]
        frame_source: PathBuf,
    },
    /// Let the device capture and analyze with its own camera
    Remote,
}

#[derive(Subcommand, Debug)]
pub enum RoofCommand {
    /// Force the rain reading
    Rain {
        #[arg(value_enum)]
        weather: Weather,
    },
    /// Return roof control to the rain sensor
    Auto,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Weather {
    Rain,
    Clear,
}

#[derive(Subcommand, Debug)]
pub enum WaterCommand {
    Start,
    Stop,
    Toggle,
    Auto,
    Manual,
}

pub async fn execute(cli: Cli) -> AppResult<()> {
    match cli.command {
        Command::Accent { color } => return accent(color.as_deref()),
        Command::Theme { mode } => return theme(mode.as_deref()),
        _ => {}
    }

    let settings = config::load_app_config().resolve(
        cli.device_url.as_deref(),
        config::device_url_from_env().as_deref(),
    )?;
    tracing::info!(device = %settings.base_url, "using device");
    let api = Arc::new(HttpDeviceClient::new(
        settings.base_url.clone(),
        settings.request_timeout,
    )?);

    match cli.command {
        Command::Status { json } => status(api.as_ref(), json).await,
        Command::Watch => watch(api, &settings).await,
        Command::Leaf { action } => leaf(api.as_ref(), &settings, action).await,
        Command::Roof { action } => roof(api, action).await,
        Command::Water { action } => water(api, &settings, action).await,
        Command::Accent { .. } | Command::Theme { .. } => Ok(()),
    }
}

async fn status(api: &dyn DeviceApi, json: bool) -> AppResult<()> {
    let status = api.status().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }
    for line in Dashboard::new().observe(&status).lines() {
        println!("{line}");
    }
    Ok(())
}

async fn watch(api: Arc<HttpDeviceClient>, settings: &DeviceSettings) -> AppResult<()> {
    let mut poller = StatusPoller::new(api, settings.poll_interval).start();
    let mut updates = poller.subscribe();
    let mut dashboard = Dashboard::new();

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                if let Some(status) = snapshot {
                    let view = dashboard.observe(&status);
                    let stamp = chrono::Local::now().format("%H:%M:%S");
                    println!("[{stamp}]");
                    for line in view.lines() {
                        println!("  {line}");
                    }
                    let history = dashboard.soil_history();
                    if !history.is_empty() {
                        let trail: Vec<String> =
                            history.points().map(|point| point.value.to_string()).collect();
                        println!("  Soil history ({}): {}", history.len(), trail.join(" "));
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupt received");
                break;
            }
        }
    }

    poller.stop();
    Ok(())
}

fn preview_store(settings: &DeviceSettings) -> AppResult<PreviewStore> {
    let store = match &settings.preview_dir {
        Some(dir) => PreviewStore::with_dir(dir.clone()),
        None => PreviewStore::with_default_dir()?,
    };
    match store.prune_stale_previews(PREVIEW_MAX_AGE_HOURS) {
        Ok(report) if report.removed_files > 0 => {
            tracing::info!(removed = report.removed_files, "pruned stale previews");
        }
        Ok(_) => {}
        Err(err) => tracing::warn!("preview prune failed: {err}"),
    }
    Ok(store)
}

async fn leaf(api: &dyn DeviceApi, settings: &DeviceSettings, action: LeafCommand) -> AppResult<()> {
    let previews = preview_store(settings)?;
    match action {
        LeafCommand::Upload { path } => {
            let mut workflow = CaptureAnalysisWorkflow::new(NoCamera, previews);
            workflow.upload_file(&path)?;
            workflow.analyze(api).await?;
            report_analysis(&workflow, &settings.base_url)
        }
        LeafCommand::Camera { frame_source } => {
            let mut workflow =
                CaptureAnalysisWorkflow::new(FrameFileCamera::new(frame_source), previews);
            capture_from_camera(&mut workflow).await?;
            workflow.analyze(api).await?;
            report_analysis(&workflow, &settings.base_url)
        }
        LeafCommand::Remote => {
            let mut workflow = CaptureAnalysisWorkflow::new(NoCamera, previews);
            workflow.analyze_remote(api).await?;
            report_analysis(&workflow, &settings.base_url)
        }
    }
}

async fn capture_from_camera<C: CameraDevice>(
    workflow: &mut CaptureAnalysisWorkflow<C>,
) -> AppResult<()> {
    if !workflow.open_camera()? {
        let message = workflow.session().error().unwrap_or("camera unavailable");
        return Err(AppError::Analysis(message.to_string()));
    }

    for _ in 0..CAMERA_READY_ATTEMPTS {
        if workflow.poll_camera_ready() {
            break;
        }
        tokio::time::sleep(CAMERA_READY_POLL).await;
    }

    if !workflow.capture()? {
        let message = workflow
            .session()
            .error()
            .unwrap_or("camera never produced a frame")
            .to_string();
        workflow.reset();
        return Err(AppError::Analysis(message));
    }
    Ok(())
}

fn report_analysis<C: CameraDevice>(
    workflow: &CaptureAnalysisWorkflow<C>,
    device_base_url: &str,
) -> AppResult<()> {
    let session = workflow.session();
    let diagnosis = match (workflow.state(), session.result()) {
        (WorkflowState::Result, Some(diagnosis)) => diagnosis,
        _ => {
            let message = session.error().unwrap_or("no result");
            return Err(AppError::Analysis(message.to_string()));
        }
    };

    println!("{}", diagnosis.banner());
    println!("  Severity: {}", diagnosis.severity.label());
    println!("  Affected area: {}", diagnosis.affected_area);
    if let Some(preview) = session.preview() {
        println!("  Image: {}", preview.location(device_base_url));
    }
    notification::send("Leaf analysis", diagnosis.banner());
    Ok(())
}

async fn roof(api: Arc<HttpDeviceClient>, action: RoofCommand) -> AppResult<()> {
    let controls = Controls::new(api.clone());
    let before = api.status().await.ok();

    let update = match action {
        RoofCommand::Rain { weather } => controls.rain_manual(weather == Weather::Rain).await?,
        RoofCommand::Auto => controls.rain_auto().await?,
    };

    let view = RoofView::from_status(&before.unwrap_or_default()).with_update(update);
    println!("{}", view.summary());
    Ok(())
}

async fn water(
    api: Arc<HttpDeviceClient>,
    settings: &DeviceSettings,
    action: WaterCommand,
) -> AppResult<()> {
    let controls = Controls::new(api.clone());
    let mut poller = StatusPoller::new(api.clone(), settings.poll_interval).start();

    let outcome = run_water_action(&controls, api.as_ref(), &poller, action).await;
    if let Some(status) = poller.latest() {
        println!("{}", WaterView::from_status(&status).summary());
    }
    poller.stop();
    outcome
}

async fn run_water_action(
    controls: &Controls,
    api: &dyn DeviceApi,
    poller: &PollerHandle,
    action: WaterCommand,
) -> AppResult<()> {
    match action {
        WaterCommand::Auto => controls.enable_auto_watering(poller).await?,
        WaterCommand::Manual => controls.enable_manual_watering(poller).await?,
        WaterCommand::Start | WaterCommand::Stop | WaterCommand::Toggle => {
            let status = api.status().await?;
            match action {
                WaterCommand::Start => {
                    controls.drive_pump(PumpAction::Start, &status, poller).await?
                }
                WaterCommand::Stop => {
                    controls.drive_pump(PumpAction::Stop, &status, poller).await?
                }
                _ => {
                    let performed = controls.toggle_pump(&status, poller).await?;
                    tracing::info!(?performed, "pump toggled");
                }
            }
        }
    }
    Ok(())
}

fn accent(color: Option<&str>) -> AppResult<()> {
    let mut store = AccentStore::init(FilePreferenceStore::open_default()?);
    if let Some(color) = color {
        store.set_accent(color.parse::<AccentColor>()?)?;
    }
    println!("Accent: {}", store.accent().as_str());
    for (property, value) in store.css_properties() {
        println!("  {property}: {value};");
    }
    Ok(())
}

fn theme(mode: Option<&str>) -> AppResult<()> {
    let mut store = AccentStore::init(FilePreferenceStore::open_default()?);
    if let Some(mode) = mode {
        store.set_mode(mode.parse::<ThemeMode>()?)?;
    }
    println!("Theme: {}", store.mode().as_str());
    Ok(())
}
