use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use pose_classification::{
    ClassifierConfig, KeypointsAndScores, PoseClassifier,
    classifier::resolve_model_path,
    model_download::{ensure_labels_ready, ensure_model_ready},
    pipeline::{
        RgbaCanvas, SINGLE_ARRAY_KEYPOINT_THRESHOLD, draw_landmarks_edges,
        keep_aspect_ratio_resize, plan_single_array, skeleton::DEFAULT_KEYPOINT_COLOR,
    },
};

const USAGE: &str =
    "usage: pose-classification <keypoints.txt> [input-image [output-image]] [--resize <size>]";

struct Args {
    keypoints: PathBuf,
    input_image: Option<PathBuf>,
    output_image: Option<PathBuf>,
    resize: Option<u32>,
}

fn parse_args() -> Result<Args> {
    let mut positional = Vec::new();
    let mut resize = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--resize" => {
                let value = args.next().context("--resize needs a value")?;
                resize = Some(
                    value
                        .parse()
                        .with_context(|| format!("invalid --resize value {value:?}"))?,
                );
            }
            "-h" | "--help" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            _ => positional.push(PathBuf::from(arg)),
        }
    }

    let mut positional = positional.into_iter();
    let Some(keypoints) = positional.next() else {
        bail!("{USAGE}");
    };

    Ok(Args {
        keypoints,
        input_image: positional.next(),
        output_image: positional.next(),
        resize,
    })
}

fn main() -> Result<()> {
    env_logger::init();

    let args = parse_args()?;
    let cfg = ClassifierConfig::from_env()?;

    let model_url = std::env::var("POSE_MODEL_URL").ok();
    let labels_url = std::env::var("POSE_LABELS_URL").ok();
    ensure_model_ready(
        &resolve_model_path(&cfg.model_path),
        model_url.as_deref(),
        |_evt| {},
    )?;
    ensure_labels_ready(&cfg.label_path, labels_url.as_deref(), |_evt| {})?;

    let mut classifier = PoseClassifier::new(&cfg)?;

    let text = std::fs::read_to_string(&args.keypoints)
        .with_context(|| format!("failed to read {}", args.keypoints.display()))?;
    let keypoints: KeypointsAndScores = text
        .parse()
        .with_context(|| format!("failed to parse {}", args.keypoints.display()))?;

    let result = classifier.classify(&keypoints)?;
    println!("{}:", args.keypoints.display());
    for category in result.iter() {
        println!("  {:<24} {:.4}", category.label, category.probability);
    }

    if let Some(input) = &args.input_image {
        let output = args
            .output_image
            .clone()
            .unwrap_or_else(|| default_output_path(input));
        render(&keypoints, input, &output, args.resize)?;
        println!("Wrote {}", output.display());
    }

    Ok(())
}

fn render(
    keypoints: &KeypointsAndScores,
    input: &Path,
    output: &Path,
    resize: Option<u32>,
) -> Result<()> {
    let mut image = image::open(input)
        .with_context(|| format!("failed to open image {}", input.display()))?
        .to_rgba8();
    let (mut content_w, mut content_h) = image.dimensions();

    if let Some(size) = resize {
        let resized = keep_aspect_ratio_resize(&image, size)?;
        content_w = resized.scaled_width;
        content_h = resized.scaled_height;
        image = resized.image;
    }

    let plan = plan_single_array(
        keypoints,
        content_h,
        content_w,
        SINGLE_ARRAY_KEYPOINT_THRESHOLD,
    );
    log::info!(
        "drawing {} keypoints and {} edges",
        plan.keypoints.len(),
        plan.edges.len()
    );

    let mut canvas = RgbaCanvas::new(image);
    draw_landmarks_edges(&mut canvas, &plan, DEFAULT_KEYPOINT_COLOR);
    canvas
        .into_image()
        .save(output)
        .with_context(|| format!("failed to save {}", output.display()))?;
    Ok(())
}

fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    input.with_file_name(format!("{stem}_pose.png"))
}
