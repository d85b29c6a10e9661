mod ort;

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    error::{PoseError, Result},
    types::{Category, ClassificationResult, KeypointsAndScores},
};

pub use self::ort::OrtBackend;

pub const MODEL_EXTENSION: &str = "onnx";
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.1;
const DEFAULT_INTRA_THREADS: usize = 4;

/// Model runtime the classifier drives. Tensors are addressed by index; inputs and
/// outputs are flat `f32` vectors with the batch dimension squeezed away.
pub trait InferenceBackend: Send {
    fn allocate(&mut self) -> Result<()>;
    fn set_input(&mut self, tensor_index: usize, data: &[f32]) -> Result<()>;
    fn invoke(&mut self) -> Result<()>;
    fn get_output(&self, tensor_index: usize) -> Result<Vec<f32>>;
}

#[derive(Clone, Debug)]
pub struct ClassifierConfig {
    pub model_path: PathBuf,
    pub label_path: PathBuf,
    /// Classification is skipped when any keypoint scores below this.
    pub score_threshold: f32,
    pub intra_threads: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models").join("pose_classifier.onnx"),
            label_path: PathBuf::from("models").join("pose_labels.txt"),
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            intra_threads: DEFAULT_INTRA_THREADS,
        }
    }
}

impl ClassifierConfig {
    /// Defaults overridden by `POSE_MODEL`, `POSE_LABELS` and `POSE_SCORE_THRESHOLD`.
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        if let Ok(model) = std::env::var("POSE_MODEL") {
            cfg.model_path = PathBuf::from(model);
        }
        if let Ok(labels) = std::env::var("POSE_LABELS") {
            cfg.label_path = PathBuf::from(labels);
        }
        if let Ok(threshold) = std::env::var("POSE_SCORE_THRESHOLD") {
            cfg.score_threshold = threshold.trim().parse().map_err(|err| {
                PoseError::Configuration(format!(
                    "POSE_SCORE_THRESHOLD={threshold:?} is not a number: {err}"
                ))
            })?;
        }
        Ok(cfg)
    }
}

/// Appends the model extension when `name` has none.
pub fn resolve_model_path(name: &Path) -> PathBuf {
    if name.extension().is_some() {
        name.to_path_buf()
    } else {
        name.with_extension(MODEL_EXTENSION)
    }
}

/// One label per line, trailing whitespace stripped, blank lines skipped.
pub fn parse_labels(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}

pub fn load_labels(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path).map_err(|err| {
        PoseError::Configuration(format!(
            "failed to read label file {}: {err}",
            path.display()
        ))
    })?;
    Ok(parse_labels(&text))
}

/// Ranks pose labels for one person's keypoints.
///
/// Owns its backend; a classifier must not be shared across threads without
/// external locking.
pub struct PoseClassifier<B = OrtBackend> {
    backend: B,
    labels: Box<[String]>,
    score_threshold: f32,
}

impl PoseClassifier<OrtBackend> {
    pub fn new(cfg: &ClassifierConfig) -> Result<Self> {
        let labels = load_labels(&cfg.label_path)?;
        let model_path = resolve_model_path(&cfg.model_path);
        let backend = OrtBackend::load(&model_path, cfg.intra_threads, labels.len())?;
        log::info!(
            "loaded pose classifier {} with {} labels from {}",
            model_path.display(),
            labels.len(),
            cfg.label_path.display()
        );
        Self::with_backend(backend, labels, cfg.score_threshold)
    }
}

impl<B: InferenceBackend> PoseClassifier<B> {
    pub fn with_backend(mut backend: B, labels: Vec<String>, score_threshold: f32) -> Result<Self> {
        backend.allocate().map_err(|err| match err {
            err @ PoseError::Configuration(_) => err,
            other => PoseError::Configuration(format!("failed to allocate tensors: {other}")),
        })?;

        Ok(Self {
            backend,
            labels: labels.into_boxed_slice(),
            score_threshold,
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn score_threshold(&self) -> f32 {
        self.score_threshold
    }

    /// Returns every label with its probability, highest first; equal probabilities
    /// keep label order and NaN probabilities rank last. If any keypoint scores below
    /// the threshold the model is not run and every label gets probability 0 in label
    /// order.
    pub fn classify(&mut self, keypoints: &KeypointsAndScores) -> Result<ClassificationResult> {
        let min_score = keypoints.min_score();
        if min_score < self.score_threshold {
            log::debug!(
                "min keypoint score {min_score:.3} below {}, skipping classification",
                self.score_threshold
            );
            return Ok(ClassificationResult::new(
                self.labels
                    .iter()
                    .map(|label| Category {
                        label: label.clone(),
                        probability: 0.0,
                    })
                    .collect(),
            ));
        }

        self.backend.set_input(0, &keypoints.to_feature_vector())?;
        self.backend.invoke()?;
        let output = self.backend.get_output(0)?;

        if output.len() != self.labels.len() {
            return Err(PoseError::Inference(format!(
                "model returned {} probabilities for {} labels",
                output.len(),
                self.labels.len()
            )));
        }

        let mut order: Vec<usize> = (0..output.len()).collect();
        order.sort_by(|&a, &b| {
            let (pa, pb) = (output[a], output[b]);
            pa.is_nan()
                .cmp(&pb.is_nan())
                .then_with(|| pb.total_cmp(&pa))
        });

        Ok(ClassificationResult::new(
            order
                .into_iter()
                .map(|idx| Category {
                    label: self.labels[idx].clone(),
                    probability: output[idx],
                })
                .collect(),
        ))
    }

    /// Same as [`classify`](Self::classify) for raw `(y, x, score)` rows.
    pub fn classify_rows(&mut self, rows: &[[f32; 3]]) -> Result<ClassificationResult> {
        let keypoints = KeypointsAndScores::from_rows(rows)?;
        self.classify(&keypoints)
    }
}
