//! Pose classification from 17 COCO keypoints, plus skeleton render planning.

pub mod classifier;
pub mod error;
pub mod model_download;
pub mod pipeline;
pub mod types;

pub use classifier::{ClassifierConfig, InferenceBackend, OrtBackend, PoseClassifier};
pub use error::{PoseError, Result};
pub use types::{
    BodyPart, BoundingBox, Category, ClassificationResult, Color, Keypoint, KeypointsAndScores,
    Person, PersonKeypoint, Point,
};
