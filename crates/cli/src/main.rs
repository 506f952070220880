use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use pixelguard_core::detection::domain::face_detector::FaceDetector;
use pixelguard_core::detection::domain::region_tracker::RegionTracker;
use pixelguard_core::detection::infrastructure::onnx_blazeface_detector::OnnxBlazefaceDetector;
use pixelguard_core::overrides::domain::manual_override::{ManualOverride, OverrideSchedule};
use pixelguard_core::overrides::infrastructure::override_file::OverrideFile;
use pixelguard_core::pipeline::frame_redaction::FrameRedactionStep;
use pixelguard_core::pipeline::infrastructure::threaded_pipeline_executor::ThreadedPipelineExecutor;
use pixelguard_core::pipeline::pipeline_executor::PipelineReport;
use pixelguard_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use pixelguard_core::pipeline::redact_image_use_case::RedactImageUseCase;
use pixelguard_core::pipeline::redact_video_use_case::RedactVideoUseCase;
use pixelguard_core::pixelation::infrastructure::pixelate_redactor::PixelateRedactor;
use pixelguard_core::shared::config::RedactionConfig;
use pixelguard_core::shared::constants::{
    BATCH_OUTPUT_DIR, BATCH_OUTPUT_PREFIX, BLAZEFACE_MODEL_NAME, IMAGE_EXTENSIONS,
    VIDEO_EXTENSIONS,
};
use pixelguard_core::shared::model_resolver::{self, ModelSource};
use pixelguard_core::video::domain::video_reader::VideoReader;
use pixelguard_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use pixelguard_core::video::infrastructure::ffmpeg_writer::FfmpegWriter;
use pixelguard_core::video::infrastructure::image_file_reader::ImageFileReader;
use pixelguard_core::video::infrastructure::image_file_writer::ImageFileWriter;

const MAX_QUALITY: u8 = 51;

/// Pixelate faces in videos and images.
#[derive(Parser, Debug)]
#[command(name = "pixelguard", version)]
struct Cli {
    /// Input video, image, or a directory of .mov/.mp4 videos.
    input: PathBuf,

    /// Output file (or directory for batch input). Defaults to
    /// `<input dir>/anonymized/anon_<name>`.
    output: Option<PathBuf>,

    /// JSON config file. Defaults to the user config directory.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long)]
    confidence: Option<f64>,

    /// Pixel block size: region dimensions are divided by this.
    #[arg(long)]
    pixelation: Option<u32>,

    /// Frames a face stays redacted after the detector loses it.
    #[arg(long)]
    persistence: Option<u32>,

    /// Fraction of the box size added on each side before redaction.
    #[arg(long)]
    padding: Option<f64>,

    /// JSON file of manual override regions.
    #[arg(long)]
    overrides: Option<PathBuf>,

    /// Manual override as start,end,x,y,w,h (seconds, pixels). Repeatable.
    #[arg(long = "region", value_name = "START,END,X,Y,W,H")]
    regions: Vec<ManualOverride>,

    /// Accept [start, end] override entries without a box, using a default
    /// top-centre region.
    #[arg(long)]
    legacy_overrides: bool,

    /// Skip face detection; only redact manual overrides.
    #[arg(long)]
    manual_only: bool,

    /// Path to the BlazeFace ONNX model.
    #[arg(long)]
    model: Option<PathBuf>,

    /// URL to download the model from when it is not found locally.
    #[arg(long)]
    model_url: Option<String>,

    /// H.264 CRF quality (0=lossless, 51=worst, default 23).
    #[arg(long)]
    quality: Option<u8>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let config = resolve_config(&cli)?;
    let job = RedactionJob {
        override_file: cli
            .overrides
            .as_deref()
            .map(|p| OverrideFile::load(p, cli.legacy_overrides))
            .transpose()?,
        cli_overrides: OverrideSchedule::new(cli.regions.clone()),
        model_path: resolve_model(&cli)?,
        quality: cli.quality,
        config,
    };

    if cli.input.is_dir() {
        let out_dir = cli
            .output
            .clone()
            .unwrap_or_else(|| cli.input.join(BATCH_OUTPUT_DIR));
        return run_batch(&job, &cli.input, &out_dir);
    }

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.input));
    let report = if is_image(&cli.input) {
        job.redact_image(&cli.input, &output)?
    } else {
        job.redact_video(&cli.input, &output)?
    };
    print_report(&output, &report);
    Ok(())
}

/// Everything needed to redact one input, shared across a batch.
struct RedactionJob {
    config: RedactionConfig,
    override_file: Option<OverrideFile>,
    cli_overrides: OverrideSchedule,
    /// `None` in manual-only mode.
    model_path: Option<PathBuf>,
    quality: Option<u8>,
}

impl RedactionJob {
    fn schedule_for(&self, input: &Path) -> OverrideSchedule {
        let mut schedule = self
            .override_file
            .as_ref()
            .map(|f| f.schedule_for(input))
            .unwrap_or_default();
        schedule.extend(self.cli_overrides.clone());
        schedule
    }

    /// Fresh tracker and redactor for one input.
    fn step_for(&self, input: &Path) -> FrameRedactionStep {
        let schedule = self.schedule_for(input);
        log::info!(
            "{}: {} manual override(s)",
            input.display(),
            schedule.len()
        );
        FrameRedactionStep::new(
            RegionTracker::from_config(&self.config),
            schedule,
            Box::new(PixelateRedactor::from_config(&self.config)),
        )
    }

    fn detector(&self) -> Result<Option<Box<dyn FaceDetector>>, Box<dyn std::error::Error>> {
        let Some(path) = &self.model_path else {
            return Ok(None);
        };
        let detector: Box<dyn FaceDetector> =
            Box::new(OnnxBlazefaceDetector::from_config(path, &self.config)?);
        Ok(Some(detector))
    }

    fn redact_video(
        &self,
        input: &Path,
        output: &Path,
    ) -> Result<PipelineReport, Box<dyn std::error::Error>> {
        let mut reader: Box<dyn VideoReader> = Box::new(FfmpegReader::new());
        let metadata = reader.open(input)?;
        let writer = match self.quality {
            Some(crf) => FfmpegWriter::new().with_crf(crf),
            None => FfmpegWriter::new(),
        };

        let total = metadata.total_frames;
        let mut use_case = RedactVideoUseCase::new(
            reader,
            Box::new(writer),
            self.detector()?,
            self.step_for(input),
            Box::new(ThreadedPipelineExecutor::new()),
        )
        .with_logger(Box::new(StdoutPipelineLogger::default()))
        .with_progress(Box::new(move |current, _| {
            eprint!("\rProcessing frame {current}/{total}");
            true
        }));

        let report = use_case.execute(&metadata, output);
        eprintln!();
        report
    }

    fn redact_image(
        &self,
        input: &Path,
        output: &Path,
    ) -> Result<PipelineReport, Box<dyn std::error::Error>> {
        let mut use_case = RedactImageUseCase::new(
            Box::new(ImageFileReader::new()),
            Box::new(ImageFileWriter::new()),
            self.detector()?,
            self.step_for(input),
        );
        use_case.execute(input, output)
    }
}

fn run_batch(
    job: &RedactionJob,
    dir: &Path,
    out_dir: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let inputs = batch_inputs(dir)?;
    if inputs.is_empty() {
        log::warn!("No .mov or .mp4 files found in {}", dir.display());
        return Ok(());
    }
    log::info!("Found {} video(s) in {}", inputs.len(), dir.display());

    let mut failed = Vec::new();
    for (i, input) in inputs.iter().enumerate() {
        let output = batch_output_path(out_dir, input);
        log::info!("[{}/{}] {}", i + 1, inputs.len(), input.display());
        match job.redact_video(input, &output) {
            Ok(report) => print_report(&output, &report),
            Err(e) => {
                log::error!("Failed to redact {}: {e}", input.display());
                failed.push(input.clone());
            }
        }
    }

    println!(
        "Batch complete: {} succeeded, {} failed",
        inputs.len() - failed.len(),
        failed.len()
    );
    if failed.is_empty() {
        Ok(())
    } else {
        Err(format!("{} of {} videos failed", failed.len(), inputs.len()).into())
    }
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input not found: {}", cli.input.display()).into());
    }
    if let Some(q) = cli.quality {
        if q > MAX_QUALITY {
            return Err(format!("Quality must be between 0 and {MAX_QUALITY}, got {q}").into());
        }
    }
    if cli.manual_only && (cli.model.is_some() || cli.model_url.is_some()) {
        return Err("--model and --model-url have no effect with --manual-only".into());
    }
    if cli.input.is_dir() && cli.output.as_deref().is_some_and(Path::is_file) {
        return Err("Output for a directory input must be a directory".into());
    }
    Ok(())
}

/// File config (or defaults) with any CLI flags layered on top.
fn resolve_config(cli: &Cli) -> Result<RedactionConfig, Box<dyn std::error::Error>> {
    let mut config = RedactionConfig::load(cli.config.as_deref())?;
    apply_cli_overrides(&mut config, cli);
    config.validate()?;
    Ok(config)
}

fn apply_cli_overrides(config: &mut RedactionConfig, cli: &Cli) {
    if let Some(v) = cli.confidence {
        config.confidence = v;
    }
    if let Some(v) = cli.pixelation {
        config.pixelation_factor = v;
    }
    if let Some(v) = cli.persistence {
        config.persistence = v;
    }
    if let Some(v) = cli.padding {
        config.padding = v;
    }
}

fn resolve_model(cli: &Cli) -> Result<Option<PathBuf>, Box<dyn std::error::Error>> {
    if cli.manual_only {
        log::info!("Manual-only mode: face detection disabled");
        return Ok(None);
    }

    log::info!("Resolving model: {BLAZEFACE_MODEL_NAME}");
    let source = ModelSource {
        explicit_path: cli.model.clone(),
        bundled_dir: bundled_models_dir(),
        download_url: cli.model_url.clone(),
    };
    let path = model_resolver::resolve(
        BLAZEFACE_MODEL_NAME,
        &source,
        Some(Box::new(download_progress)),
    )?;
    log::info!("Using model {}", path.display());
    Ok(Some(path))
}

/// `models/` next to the executable.
fn bundled_models_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("models")))
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn is_image(path: &Path) -> bool {
    has_extension(path, IMAGE_EXTENSIONS)
}

/// Videos directly inside `dir`, sorted by path.
fn batch_inputs(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && has_extension(&path, VIDEO_EXTENSIONS) {
            inputs.push(path);
        }
    }
    inputs.sort();
    Ok(inputs)
}

/// `<out_dir>/anon_<stem>.mp4`.
fn batch_output_path(out_dir: &Path, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    out_dir.join(format!("{BATCH_OUTPUT_PREFIX}{stem}.mp4"))
}

/// `<input dir>/anonymized/anon_<name>`; videos always become `.mp4`.
fn default_output_path(input: &Path) -> PathBuf {
    let out_dir = input
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(BATCH_OUTPUT_DIR);
    if is_image(input) {
        let name = input
            .file_name()
            .map(|s| s.to_string_lossy())
            .unwrap_or_default();
        out_dir.join(format!("{BATCH_OUTPUT_PREFIX}{name}"))
    } else {
        batch_output_path(&out_dir, input)
    }
}

fn print_report(output: &Path, report: &PipelineReport) {
    println!(
        "{}: {} frame(s), {} region(s) redacted",
        output.display(),
        report.frames_processed,
        report.regions_redacted
    );
    if report.detection_unavailable > 0 {
        println!(
            "  face detection unavailable on {} frame(s); those frames carry only tracked and manual regions",
            report.detection_unavailable
        );
    }
    if report.cancelled {
        println!("  run stopped early; output is truncated");
    }
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
    if total > 0 && downloaded >= total {
        eprintln!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixelguard_core::shared::region::Region;
    use rstest::rstest;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("pixelguard").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_parse_minimal() {
        let cli = parse(&["in.mp4"]);
        assert_eq!(cli.input, PathBuf::from("in.mp4"));
        assert!(cli.output.is_none());
        assert!(cli.regions.is_empty());
        assert!(!cli.manual_only);
        assert!(!cli.legacy_overrides);
    }

    #[test]
    fn test_parse_repeated_regions() {
        let cli = parse(&[
            "in.mp4",
            "--region",
            "2,4,50,50,30,30",
            "--region",
            "0.5,1.5,0,0,10,20",
        ]);
        assert_eq!(cli.regions.len(), 2);
        assert_eq!(cli.regions[0].start(), 2.0);
        assert_eq!(
            cli.regions[1].region_for(100, 100),
            Region::new(0, 0, 10, 20)
        );
    }

    #[rstest]
    #[case::too_few_fields("1,2,3")]
    #[case::not_a_number("a,2,0,0,10,10")]
    #[case::reversed_interval("4,2,0,0,10,10")]
    fn test_parse_rejects_bad_region(#[case] value: &str) {
        let result =
            Cli::try_parse_from(["pixelguard", "in.mp4", "--region", value]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_flags_override_config() {
        let cli = parse(&[
            "in.mp4",
            "--confidence",
            "0.6",
            "--pixelation",
            "8",
            "--persistence",
            "5",
            "--padding",
            "0",
        ]);
        let mut config = RedactionConfig::default();
        apply_cli_overrides(&mut config, &cli);
        assert_eq!(
            config,
            RedactionConfig {
                confidence: 0.6,
                pixelation_factor: 8,
                persistence: 5,
                padding: 0.0,
            }
        );
    }

    #[test]
    fn test_cli_flag_repairs_invalid_config_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"padding": -1.0, "pixelation_factor": 8}"#).unwrap();
        let path = path.to_string_lossy().into_owned();

        let config = resolve_config(&parse(&["in.mp4", "--config", &path, "--padding", "0.3"]))
            .unwrap();
        assert_eq!(config.padding, 0.3);
        assert_eq!(config.pixelation_factor, 8);

        assert!(resolve_config(&parse(&["in.mp4", "--config", &path])).is_err());
    }

    #[test]
    fn test_unset_flags_keep_config() {
        let mut config = RedactionConfig::default();
        apply_cli_overrides(&mut config, &parse(&["in.mp4"]));
        assert_eq!(config, RedactionConfig::default());
    }

    #[test]
    fn test_validate_missing_input() {
        let cli = parse(&["/definitely/not/here.mp4"]);
        assert!(validate(&cli).unwrap_err().to_string().contains("not found"));
    }

    #[rstest]
    #[case::lossless("0", true)]
    #[case::worst("51", true)]
    #[case::out_of_range("52", false)]
    fn test_validate_quality(#[case] quality: &str, #[case] ok: bool) {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.mp4");
        std::fs::write(&input, b"").unwrap();
        let cli = parse(&[input.to_str().unwrap(), "--quality", quality]);
        assert_eq!(validate(&cli).is_ok(), ok);
    }

    #[test]
    fn test_validate_manual_only_with_model() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.mp4");
        std::fs::write(&input, b"").unwrap();
        let cli = parse(&[input.to_str().unwrap(), "--manual-only", "--model", "m.onnx"]);
        assert!(validate(&cli).is_err());
    }

    #[test]
    fn test_manual_only_skips_model_resolution() {
        let cli = parse(&["in.mp4", "--manual-only"]);
        assert_eq!(resolve_model(&cli).unwrap(), None);
    }

    #[rstest]
    #[case::png("photo.png", true)]
    #[case::upper_jpg("PHOTO.JPG", true)]
    #[case::video("clip.mp4", false)]
    #[case::no_extension("README", false)]
    fn test_is_image(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_image(Path::new(name)), expected);
    }

    #[test]
    fn test_batch_inputs_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.MOV", "a.mp4", "notes.txt", "c.mkv", "d.Mp4"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.mp4")).unwrap();

        let names: Vec<_> = batch_inputs(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.mp4", "b.MOV", "d.Mp4"]);
    }

    #[rstest]
    #[case::mov("/videos/clip.MOV", "/videos/anonymized/anon_clip.mp4")]
    #[case::mp4("/videos/take 2.mp4", "/videos/anonymized/anon_take 2.mp4")]
    fn test_batch_output_path(#[case] input: &str, #[case] expected: &str) {
        let out_dir = Path::new("/videos").join(BATCH_OUTPUT_DIR);
        assert_eq!(
            batch_output_path(&out_dir, Path::new(input)),
            PathBuf::from(expected)
        );
    }

    #[rstest]
    #[case::video("/data/clip.mov", "/data/anonymized/anon_clip.mp4")]
    #[case::image("/data/face.png", "/data/anonymized/anon_face.png")]
    fn test_default_output_path(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(default_output_path(Path::new(input)), PathBuf::from(expected));
    }

    #[test]
    fn test_job_merges_file_and_cli_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("overrides.json");
        std::fs::write(&file, r#"{"clip.mp4": [[0, 1, 0, 0, 10, 10]]}"#).unwrap();

        let job = RedactionJob {
            config: RedactionConfig::default(),
            override_file: Some(OverrideFile::load(&file, false).unwrap()),
            cli_overrides: OverrideSchedule::new(vec![ManualOverride::explicit(
                5.0,
                6.0,
                Region::new(1, 1, 2, 2),
            )
            .unwrap()]),
            model_path: None,
            quality: None,
        };

        assert_eq!(job.schedule_for(Path::new("/v/clip.mp4")).len(), 2);
        assert_eq!(job.schedule_for(Path::new("/v/other.mp4")).len(), 1);
        assert!(job.detector().unwrap().is_none());
    }
}
