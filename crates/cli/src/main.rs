use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::process;
use std::thread;

use clap::{Args, Parser, Subcommand};
use crossbeam_channel::Receiver;

use facewatch_core::detection::domain::face_detector::FaceDetector;
use facewatch_core::detection::infrastructure::onnx_face_detector::OnnxFaceDetector;
use facewatch_core::identity::domain::embedding_store::EmbeddingStore;
use facewatch_core::identity::domain::similarity_matcher::SimilarityMatcher;
use facewatch_core::identity::infrastructure::json_embedding_store::JsonEmbeddingStore;
use facewatch_core::notification::domain::notification_sink::NotificationSink;
use facewatch_core::notification::infrastructure::console_notification_sink::ConsoleNotificationSink;
use facewatch_core::notification::infrastructure::http_notification_sink::HttpNotificationSink;
use facewatch_core::pipeline::enroll_face_use_case::EnrollFaceUseCase;
use facewatch_core::pipeline::operator_command::OperatorCommand;
use facewatch_core::pipeline::pipeline_logger::StatsPipelineLogger;
use facewatch_core::pipeline::watch_faces_use_case::{StopReason, WatchFacesUseCase};
use facewatch_core::presentation::snapshot_recorder::SnapshotRecorder;
use facewatch_core::shared::constants::{
    EMBEDDING_MODEL_NAME, EMBEDDING_MODEL_URL, IMAGE_EXTENSIONS, YOLO_MODEL_NAME, YOLO_MODEL_URL,
};
use facewatch_core::shared::model_resolver;
use facewatch_core::shared::settings::Settings;
use facewatch_core::video::domain::video_reader::VideoReader;
use facewatch_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use facewatch_core::video::infrastructure::image_file_reader::ImageFileReader;
use facewatch_core::video::infrastructure::image_file_writer::ImageFileWriter;

/// Live face recognition with throttled notifications.
#[derive(Parser)]
#[command(name = "facewatch", version)]
struct Cli {
    /// Settings file (default: <config dir>/FaceWatch/settings.json).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Embedding store file, overriding the settings file.
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Watch a camera or video and report recognized faces.
    Watch(WatchArgs),
    /// Enroll the largest face in a still image.
    Enroll(EnrollArgs),
    /// List enrolled identities.
    List,
}

#[derive(Args)]
struct WatchArgs {
    /// Capture device, video file, or image.
    #[arg(default_value = "/dev/video0")]
    source: PathBuf,

    /// Input format for capture devices (v4l2, avfoundation, dshow).
    #[arg(long)]
    input_format: Option<String>,

    /// Capture option as KEY=VALUE, e.g. video_size=640x480 (repeatable).
    #[arg(long = "capture-option", value_parser = parse_key_value)]
    capture_options: Vec<(String, String)>,

    /// Minimum cosine similarity for a match (-1.0 to 1.0).
    #[arg(long)]
    threshold: Option<f32>,

    /// Seconds between notifications for the same person.
    #[arg(long)]
    cooldown: Option<u64>,

    /// POST each notification to this URL.
    #[arg(long)]
    notify_url: Option<String>,

    /// Leave the similarity score out of notification payloads.
    #[arg(long)]
    no_score: bool,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long)]
    confidence: Option<f64>,

    /// Save an annotated frame whenever a notification is sent.
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,
}

#[derive(Args)]
struct EnrollArgs {
    /// Name to enroll the face under.
    #[arg(long)]
    name: String,

    /// Image containing the face.
    image: PathBuf,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long)]
    confidence: Option<f64>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(store) = cli.store {
        settings.store_path = Some(store);
    }

    match cli.command {
        Command::Watch(args) => {
            apply_watch_overrides(&mut settings, &args);
            settings.validate()?;
            run_watch(&settings, args)
        }
        Command::Enroll(args) => {
            if let Some(confidence) = args.confidence {
                settings.detection_confidence = confidence;
            }
            settings.validate()?;
            run_enroll(&settings, &args)
        }
        Command::List => run_list(&settings),
    }
}

fn load_settings(explicit: Option<&Path>) -> Result<Settings, Box<dyn std::error::Error>> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(format!("Settings file not found: {}", path.display()).into());
        }
        return Ok(Settings::load(path)?);
    }
    match Settings::default_path() {
        Some(path) => Ok(Settings::load(&path)?),
        None => Ok(Settings::default()),
    }
}

fn apply_watch_overrides(settings: &mut Settings, args: &WatchArgs) {
    if let Some(threshold) = args.threshold {
        settings.threshold = threshold;
    }
    if let Some(cooldown) = args.cooldown {
        settings.cooldown_secs = cooldown;
    }
    if let Some(url) = &args.notify_url {
        settings.notify_url = Some(url.clone());
    }
    if args.no_score {
        settings.include_score = false;
    }
    if let Some(confidence) = args.confidence {
        settings.detection_confidence = confidence;
    }
}

fn run_watch(settings: &Settings, args: WatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store_path = settings.resolved_store_path()?;
    let detector = build_detector(settings)?;

    let mut sinks: Vec<Box<dyn NotificationSink>> = vec![Box::new(ConsoleNotificationSink::new())];
    if let Some(url) = &settings.notify_url {
        sinks.push(Box::new(HttpNotificationSink::new(
            url,
            settings.notify_timeout(),
            settings.include_score,
        )?));
        log::info!("Posting notifications to {url}");
    }

    let snapshots = args
        .snapshot_dir
        .clone()
        .map(|dir| SnapshotRecorder::new(dir, Box::new(ImageFileWriter::new())));

    let mut use_case = WatchFacesUseCase::new(
        detector,
        Box::new(JsonEmbeddingStore::new(&store_path)),
        SimilarityMatcher::new(settings.threshold),
        settings.cooldown(),
        sinks,
        snapshots,
        Box::new(StatsPipelineLogger::default()),
    )?;

    let mut reader = open_watch_reader(&args);
    let metadata = reader.open(&args.source)?;
    log::info!("Watching {}", metadata.describe());
    eprintln!("Commands: `c <name>` enrolls the largest visible face, `q` quits.");

    let commands = spawn_operator_console();
    let summary = use_case.run(reader.frames(), &commands);
    reader.close();
    let summary = summary?;

    log::info!(
        "Stopped after {} frames: {} notifications, {} enrolled",
        summary.frames,
        summary.events,
        summary.enrolled
    );
    match summary.stop {
        StopReason::SourceFailed(message) => Err(format!("Frame source failed: {message}").into()),
        StopReason::Quit | StopReason::SourceExhausted => Ok(()),
    }
}

fn run_enroll(settings: &Settings, args: &EnrollArgs) -> Result<(), Box<dyn std::error::Error>> {
    if !args.image.exists() {
        return Err(format!("Image not found: {}", args.image.display()).into());
    }
    if !is_image(&args.image) {
        return Err(format!(
            "Unsupported image type: {} (expected one of {})",
            args.image.display(),
            IMAGE_EXTENSIONS.join(", ")
        )
        .into());
    }

    let store_path = settings.resolved_store_path()?;
    let mut use_case = EnrollFaceUseCase::new(
        Box::new(ImageFileReader::new()),
        build_detector(settings)?,
        Box::new(JsonEmbeddingStore::new(&store_path)),
    );
    let record = use_case.execute(&args.image, &args.name)?;
    println!(
        "Enrolled {} ({}-d embedding) in {}",
        record.name(),
        record.dimensions(),
        store_path.display()
    );
    Ok(())
}

fn run_list(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let store_path = settings.resolved_store_path()?;
    let records = JsonEmbeddingStore::new(&store_path).load()?;
    if records.is_empty() {
        println!("No identities enrolled ({})", store_path.display());
        return Ok(());
    }
    for record in &records {
        println!("{}\t{}-d", record.name(), record.dimensions());
    }
    Ok(())
}

fn build_detector(settings: &Settings) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    let detection_model = resolve_model(YOLO_MODEL_NAME, YOLO_MODEL_URL)?;
    let embedding_model = resolve_model(EMBEDDING_MODEL_NAME, EMBEDDING_MODEL_URL)?;
    Ok(Box::new(OnnxFaceDetector::new(
        &detection_model,
        &embedding_model,
        settings.detection_confidence,
    )?))
}

fn resolve_model(name: &'static str, url: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {name}");
    let path = model_resolver::resolve(
        name,
        url,
        Some(Box::new(move |downloaded, total| {
            download_progress(name, downloaded, total)
        })),
    )?;
    Ok(path)
}

fn open_watch_reader(args: &WatchArgs) -> Box<dyn VideoReader> {
    if is_image(&args.source) {
        return Box::new(ImageFileReader::new());
    }

    let mut reader = FfmpegReader::new();
    if let Some(format) = args
        .input_format
        .clone()
        .or_else(|| default_input_format(&args.source))
    {
        reader = reader.with_input_format(format);
    }
    for (key, value) in &args.capture_options {
        reader = reader.with_option(key, value);
    }
    Box::new(reader)
}

/// Linux capture devices need the v4l2 demuxer; everything else is probed.
fn default_input_format(source: &Path) -> Option<String> {
    let is_v4l2_device = cfg!(target_os = "linux") && source.starts_with("/dev") && !source.is_file();
    is_v4l2_device.then(|| "v4l2".to_string())
}

/// Reads operator commands from stdin on a background thread.
///
/// Closing stdin leaves the watch loop running.
fn spawn_operator_console() -> Receiver<OperatorCommand> {
    let (tx, rx) = crossbeam_channel::unbounded();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match OperatorCommand::parse(&line) {
                Ok(command) => {
                    let quit = command == OperatorCommand::Quit;
                    if tx.send(command).is_err() || quit {
                        break;
                    }
                }
                Err(e) => eprintln!("{e}"),
            }
        }
    });
    rx
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

fn download_progress(name: &str, downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading {name}... {pct}%");
    } else {
        eprint!("\rDownloading {name}... {downloaded} bytes");
    }
    if total > 0 && downloaded >= total {
        eprintln!();
    }
}
