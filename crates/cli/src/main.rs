use std::path::{Path, PathBuf};
use std::process;

use clap::error::ErrorKind;
use clap::Parser;

use facetrack_core::detection::domain::face_detector::FaceDetector;
use facetrack_core::detection::infrastructure::model_resolver;
use facetrack_core::detection::infrastructure::onnx_yolo_detector::OnnxYoloDetector;
use facetrack_core::pipeline::pipeline_logger::LogPipelineLogger;
use facetrack_core::pipeline::track_faces_use_case::TrackFacesUseCase;
use facetrack_core::shared::constants::{
    DEFAULT_CONFIDENCE, DEFAULT_STRIDE, MATCH_DISTANCE, MAX_GAP_SECONDS, MAX_SIZE_DIFFERENCE,
    MIN_TRACK_DURATION, YOLO_MODEL_NAME, YOLO_MODEL_URL,
};
use facetrack_core::shared::error::TrackingError;
use facetrack_core::tracking::domain::track::TrackReport;
use facetrack_core::tracking::domain::tracker_config::TrackerConfig;
use facetrack_core::video::infrastructure::ffmpeg_reader::FfmpegReader;

/// Progress lines are logged once per this many decoded frames.
const PROGRESS_THROTTLE_FRAMES: usize = 100;

/// Track faces through a video and print the tracks as JSON.
#[derive(Parser)]
#[command(name = "facetrack")]
struct Cli {
    /// Input video file.
    input: Option<PathBuf>,

    /// Run detection every Nth frame (1 = every frame).
    #[arg(long, default_value_t = DEFAULT_STRIDE)]
    stride: usize,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
    confidence: f64,

    /// Detector model file. Downloaded to the user cache when omitted.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Max center distance for a detection to continue a track (normalized).
    #[arg(long, default_value_t = MATCH_DISTANCE)]
    match_distance: f64,

    /// Max |dw| + |dh| for a detection to continue a track (normalized).
    #[arg(long, default_value_t = MAX_SIZE_DIFFERENCE)]
    max_size_difference: f64,

    /// Seconds a track may go unmatched before it stops matching.
    #[arg(long, default_value_t = MAX_GAP_SECONDS)]
    max_gap: f64,

    /// Tracks shorter than this many seconds are dropped.
    #[arg(long, default_value_t = MIN_TRACK_DURATION)]
    min_duration: f64,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pretty: bool,
}

fn main() {
    env_logger::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            println!("{}", error_envelope(&parse_error_message(&e)));
            process::exit(1);
        }
    };
    let pretty = cli.pretty;

    let rendered = match run(cli) {
        Ok(report) => {
            if pretty {
                serde_json::to_string_pretty(&report)
            } else {
                serde_json::to_string(&report)
            }
        }
        Err(e) => {
            log::debug!("Tracking failed: {e:?}");
            println!("{}", error_envelope(&e.to_string()));
            process::exit(exit_code(e.as_ref()));
        }
    };

    match rendered {
        Ok(json) => println!("{json}"),
        Err(e) => {
            println!("{}", error_envelope(&e.to_string()));
            process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<TrackReport, Box<dyn std::error::Error>> {
    let input = cli.input.as_deref().ok_or("Missing video path")?;
    validate(&cli)?;

    // Fail before the model is resolved, which may mean a download.
    if !input.is_file() {
        return Err(TrackingError::SourceUnavailable.into());
    }

    let detector = build_detector(cli.model.as_deref(), cli.confidence)?;
    let mut use_case = TrackFacesUseCase::new(
        Box::new(FfmpegReader::new()),
        detector,
        cli.stride,
        tracker_config(&cli),
        Box::new(LogPipelineLogger::new(PROGRESS_THROTTLE_FRAMES)),
    );

    let tracks = use_case.execute(input)?;
    Ok(TrackReport { tracks })
}

fn error_envelope(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}

/// An unopenable video is a reported outcome, not a failure of the tool.
fn exit_code(err: &(dyn std::error::Error + 'static)) -> i32 {
    match err.downcast_ref::<TrackingError>() {
        Some(TrackingError::SourceUnavailable) => 0,
        _ => 1,
    }
}

/// First line of a clap error without its `error: ` prefix or usage block.
fn parse_error_message(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let first = rendered.lines().next().unwrap_or_default().trim();
    first.strip_prefix("error: ").unwrap_or(first).to_string()
}

fn tracker_config(cli: &Cli) -> TrackerConfig {
    TrackerConfig {
        match_distance: cli.match_distance,
        max_size_difference: cli.max_size_difference,
        max_gap_seconds: cli.max_gap,
        min_track_duration: cli.min_duration,
    }
}

fn build_detector(
    model: Option<&Path>,
    confidence: f64,
) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {YOLO_MODEL_NAME}");
    let model_path = model_resolver::resolve(
        YOLO_MODEL_NAME,
        YOLO_MODEL_URL,
        model,
        Some(Box::new(download_progress)),
    )
    .map_err(TrackingError::from)?;

    Ok(Box::new(OnnxYoloDetector::new(&model_path, confidence)?))
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.stride == 0 {
        return Err(invalid("stride must be at least 1, got 0".to_string()));
    }
    let unit_ranged = [
        ("confidence", cli.confidence),
        ("match distance", cli.match_distance),
        ("max size difference", cli.max_size_difference),
    ];
    for (name, value) in unit_ranged {
        if !(0.0..=1.0).contains(&value) {
            return Err(invalid(format!(
                "{name} must be between 0.0 and 1.0, got {value}"
            )));
        }
    }
    let non_negative = [("max gap", cli.max_gap), ("min duration", cli.min_duration)];
    for (name, value) in non_negative {
        if !value.is_finite() || value < 0.0 {
            return Err(invalid(format!("{name} must be >= 0, got {value}")));
        }
    }
    Ok(())
}

fn invalid(message: String) -> Box<dyn std::error::Error> {
    TrackingError::InvalidConfig(message).into()
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
        if downloaded >= total {
            eprintln!();
        }
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["facetrack"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults_match_tracker_defaults() {
        let cli = parse(&["clip.mp4"]);
        assert_eq!(cli.stride, 2);
        assert_eq!(tracker_config(&cli), TrackerConfig::default());
        assert!(!cli.pretty);
        assert!(validate(&cli).is_ok());
    }

    #[test]
    fn test_missing_input_is_reported() {
        let err = run(parse(&[])).unwrap_err();
        assert_eq!(err.to_string(), "Missing video path");
        assert_eq!(exit_code(err.as_ref()), 1);
    }

    #[test]
    fn test_zero_stride_rejected() {
        let cli = parse(&["clip.mp4", "--stride", "0"]);
        assert!(validate(&cli).is_err());
    }

    #[test]
    fn test_confidence_out_of_range_rejected() {
        let cli = parse(&["clip.mp4", "--confidence", "1.5"]);
        let err = validate(&cli).unwrap_err();
        assert!(err.to_string().contains("confidence"));
    }

    #[test]
    fn test_negative_min_duration_rejected() {
        let cli = parse(&["clip.mp4", "--min-duration=-1"]);
        assert!(validate(&cli).is_err());
    }

    #[test]
    fn test_overrides_flow_into_config() {
        let cli = parse(&[
            "clip.mp4",
            "--match-distance",
            "0.25",
            "--max-size-difference",
            "0.5",
            "--max-gap",
            "1",
            "--min-duration",
            "2",
            "--pretty",
        ]);
        let config = tracker_config(&cli);
        assert_eq!(config.match_distance, 0.25);
        assert_eq!(config.max_size_difference, 0.5);
        assert_eq!(config.max_gap_seconds, 1.0);
        assert_eq!(config.min_track_duration, 2.0);
        assert!(cli.pretty);
    }

    #[test]
    fn test_nonexistent_input_is_source_unavailable_with_zero_exit() {
        let cli = parse(&["/nonexistent/clip.mp4"]);
        let err = run(cli).unwrap_err();
        assert_eq!(err.to_string(), "Could not open video");
        assert_eq!(exit_code(err.as_ref()), 0);
        assert_eq!(
            error_envelope(&err.to_string()),
            r#"{"error":"Could not open video"}"#
        );
    }

    #[test]
    fn test_invalid_flag_values_fail_with_nonzero_exit() {
        let err = run(parse(&["/nonexistent/clip.mp4", "--stride", "0"])).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TrackingError>(),
            Some(TrackingError::InvalidConfig(_))
        ));
        assert_eq!(exit_code(err.as_ref()), 1);
    }

    #[test]
    fn test_processing_failure_exits_nonzero() {
        let err: Box<dyn std::error::Error> =
            TrackingError::Processing("inference failed".to_string()).into();
        assert_eq!(exit_code(err.as_ref()), 1);
    }

    #[test]
    fn test_non_numeric_stride_is_a_structured_error() {
        let err = Cli::try_parse_from(["facetrack", "clip.mp4", "--stride", "abc"])
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);

        let message = parse_error_message(&err);
        assert!(message.contains("--stride"));
        assert!(!message.starts_with("error:"));
        assert!(!message.contains('\n'));

        let envelope: serde_json::Value =
            serde_json::from_str(&error_envelope(&message)).unwrap();
        assert_eq!(envelope["error"], message.as_str());
    }

    #[test]
    fn test_unknown_flag_is_a_structured_error() {
        let err = Cli::try_parse_from(["facetrack", "clip.mp4", "--bogus"])
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
        assert!(parse_error_message(&err).contains("--bogus"));
    }

    #[test]
    fn test_help_is_not_treated_as_an_error() {
        let err = Cli::try_parse_from(["facetrack", "--help"]).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }
}
