use std::{fmt, str::FromStr};

use crate::error::{PoseError, Result};

pub const NUM_KEYPOINTS: usize = 17;
/// Length of the flattened `(y, x, score)` feature vector fed to the classifier.
pub const FEATURE_LEN: usize = NUM_KEYPOINTS * 3;

pub type Color = [u8; 3];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BodyPart {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl BodyPart {
    /// Joints in keypoint index order.
    pub const ALL: [BodyPart; NUM_KEYPOINTS] = [
        BodyPart::Nose,
        BodyPart::LeftEye,
        BodyPart::RightEye,
        BodyPart::LeftEar,
        BodyPart::RightEar,
        BodyPart::LeftShoulder,
        BodyPart::RightShoulder,
        BodyPart::LeftElbow,
        BodyPart::RightElbow,
        BodyPart::LeftWrist,
        BodyPart::RightWrist,
        BodyPart::LeftHip,
        BodyPart::RightHip,
        BodyPart::LeftKnee,
        BodyPart::RightKnee,
        BodyPart::LeftAnkle,
        BodyPart::RightAnkle,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            BodyPart::Nose => "nose",
            BodyPart::LeftEye => "left_eye",
            BodyPart::RightEye => "right_eye",
            BodyPart::LeftEar => "left_ear",
            BodyPart::RightEar => "right_ear",
            BodyPart::LeftShoulder => "left_shoulder",
            BodyPart::RightShoulder => "right_shoulder",
            BodyPart::LeftElbow => "left_elbow",
            BodyPart::RightElbow => "right_elbow",
            BodyPart::LeftWrist => "left_wrist",
            BodyPart::RightWrist => "right_wrist",
            BodyPart::LeftHip => "left_hip",
            BodyPart::RightHip => "right_hip",
            BodyPart::LeftKnee => "left_knee",
            BodyPart::RightKnee => "right_knee",
            BodyPart::LeftAnkle => "left_ankle",
            BodyPart::RightAnkle => "right_ankle",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|part| part.name() == name)
    }
}

impl fmt::Display for BodyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One joint as produced by the detector: normalized `(y, x)` in `[0, 1]` plus confidence.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Keypoint {
    pub y: f32,
    pub x: f32,
    pub score: f32,
}

/// Exactly 17 keypoints addressed by [`BodyPart`] index.
#[derive(Clone, Debug, PartialEq)]
pub struct KeypointsAndScores {
    keypoints: [Keypoint; NUM_KEYPOINTS],
}

impl KeypointsAndScores {
    pub fn new(keypoints: [Keypoint; NUM_KEYPOINTS]) -> Self {
        Self { keypoints }
    }

    /// Builds from `(y, x, score)` rows, the layout MoveNet and PoseNet emit.
    pub fn from_rows(rows: &[[f32; 3]]) -> Result<Self> {
        if rows.len() != NUM_KEYPOINTS {
            return Err(PoseError::InvalidArgument(format!(
                "expected {NUM_KEYPOINTS} keypoints, got {}",
                rows.len()
            )));
        }

        let mut keypoints = [Keypoint::default(); NUM_KEYPOINTS];
        for (slot, [y, x, score]) in keypoints.iter_mut().zip(rows.iter().copied()) {
            *slot = Keypoint { y, x, score };
        }
        Ok(Self { keypoints })
    }

    pub fn keypoints(&self) -> &[Keypoint; NUM_KEYPOINTS] {
        &self.keypoints
    }

    pub fn get(&self, part: BodyPart) -> &Keypoint {
        &self.keypoints[part.index()]
    }

    pub fn min_score(&self) -> f32 {
        self.keypoints
            .iter()
            .map(|kp| kp.score)
            .fold(f32::INFINITY, f32::min)
    }

    /// Flattens to `[y0, x0, s0, y1, x1, s1, ...]` in joint order.
    pub fn to_feature_vector(&self) -> Vec<f32> {
        let mut features = Vec::with_capacity(FEATURE_LEN);
        for kp in &self.keypoints {
            features.extend_from_slice(&[kp.y, kp.x, kp.score]);
        }
        features
    }
}

/// Text form: one `y x score` row per joint, whitespace or comma separated.
/// Blank lines and `#` comments are ignored.
impl FromStr for KeypointsAndScores {
    type Err = PoseError;

    fn from_str(text: &str) -> Result<Self> {
        let mut rows = Vec::with_capacity(NUM_KEYPOINTS);
        for (line_no, line) in text.lines().enumerate() {
            let line = line.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }

            let values = line
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|v| !v.is_empty())
                .map(|v| {
                    v.parse::<f32>().map_err(|err| {
                        PoseError::InvalidArgument(format!(
                            "line {}: cannot parse {v:?}: {err}",
                            line_no + 1
                        ))
                    })
                })
                .collect::<Result<Vec<f32>>>()?;

            let [y, x, score] = values[..] else {
                return Err(PoseError::InvalidArgument(format!(
                    "line {}: expected 3 values (y x score), got {}",
                    line_no + 1,
                    values.len()
                )));
            };
            rows.push([y, x, score]);
        }

        Self::from_rows(&rows)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PersonKeypoint {
    pub body_part: BodyPart,
    /// Absolute pixel coordinate.
    pub coordinate: Point,
    pub score: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub start_point: Point,
    pub end_point: Point,
}

/// One detected individual in absolute pixel coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct Person {
    pub keypoints: [PersonKeypoint; NUM_KEYPOINTS],
    pub bounding_box: Option<BoundingBox>,
    pub score: f32,
}

impl Person {
    /// Scales normalized detector output (keypoints and an optional normalized box)
    /// to an image of `height` x `width` pixels.
    pub fn from_normalized(
        keypoints: &KeypointsAndScores,
        score: f32,
        bounding_box: Option<BoundingBox>,
        height: u32,
        width: u32,
    ) -> Self {
        let (h, w) = (height as f32, width as f32);
        let scale = |p: Point| Point::new(p.x * w, p.y * h);

        let mut scaled = [PersonKeypoint {
            body_part: BodyPart::Nose,
            coordinate: Point::default(),
            score: 0.0,
        }; NUM_KEYPOINTS];
        for ((slot, kp), part) in scaled
            .iter_mut()
            .zip(keypoints.keypoints())
            .zip(BodyPart::ALL)
        {
            *slot = PersonKeypoint {
                body_part: part,
                coordinate: Point::new(kp.x * w, kp.y * h),
                score: kp.score,
            };
        }

        Self {
            keypoints: scaled,
            bounding_box: bounding_box.map(|bbox| BoundingBox {
                start_point: scale(bbox.start_point),
                end_point: scale(bbox.end_point),
            }),
            score,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Category {
    pub label: String,
    pub probability: f32,
}

/// One category per known label, ranked by probability (highest first).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClassificationResult {
    categories: Vec<Category>,
}

impl ClassificationResult {
    pub(crate) fn new(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    pub fn top(&self) -> Option<&Category> {
        self.categories.first()
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Category> {
        self.categories.iter()
    }
}

impl IntoIterator for ClassificationResult {
    type Item = Category;
    type IntoIter = std::vec::IntoIter<Category>;

    fn into_iter(self) -> Self::IntoIter {
        self.categories.into_iter()
    }
}
