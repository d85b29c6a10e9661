use crate::types::{BodyPart, Color, KeypointsAndScores, NUM_KEYPOINTS, Person, Point};

use super::canvas::Canvas;

const LEFT_COLOR: Color = [147, 20, 255];
const RIGHT_COLOR: Color = [255, 255, 0];
const CENTER_COLOR: Color = [0, 255, 255];

pub const DEFAULT_KEYPOINT_COLOR: Color = [0, 255, 0];
/// Visibility cutoff of the single-array path; a keypoint must score strictly above it.
pub const SINGLE_ARRAY_KEYPOINT_THRESHOLD: f32 = 0.11;

pub const KEYPOINT_RADIUS: i32 = 2;
pub const KEYPOINT_THICKNESS: i32 = 4;
pub const EDGE_THICKNESS: i32 = 2;
pub const BOX_THICKNESS: i32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Edge {
    pub a: BodyPart,
    pub b: BodyPart,
    pub color: Color,
}

const fn edge(a: BodyPart, b: BodyPart, color: Color) -> Edge {
    Edge { a, b, color }
}

/// Skeleton topology with the display color of each bone.
pub const KEYPOINT_EDGES: [Edge; 18] = [
    edge(BodyPart::Nose, BodyPart::LeftEye, LEFT_COLOR),
    edge(BodyPart::Nose, BodyPart::RightEye, RIGHT_COLOR),
    edge(BodyPart::LeftEye, BodyPart::LeftEar, LEFT_COLOR),
    edge(BodyPart::RightEye, BodyPart::RightEar, RIGHT_COLOR),
    edge(BodyPart::Nose, BodyPart::LeftShoulder, LEFT_COLOR),
    edge(BodyPart::Nose, BodyPart::RightShoulder, RIGHT_COLOR),
    edge(BodyPart::LeftShoulder, BodyPart::LeftElbow, LEFT_COLOR),
    edge(BodyPart::LeftElbow, BodyPart::LeftWrist, LEFT_COLOR),
    edge(BodyPart::RightShoulder, BodyPart::RightElbow, RIGHT_COLOR),
    edge(BodyPart::RightElbow, BodyPart::RightWrist, RIGHT_COLOR),
    edge(BodyPart::LeftShoulder, BodyPart::RightShoulder, CENTER_COLOR),
    edge(BodyPart::LeftShoulder, BodyPart::LeftHip, LEFT_COLOR),
    edge(BodyPart::RightShoulder, BodyPart::RightHip, RIGHT_COLOR),
    edge(BodyPart::LeftHip, BodyPart::RightHip, CENTER_COLOR),
    edge(BodyPart::LeftHip, BodyPart::LeftKnee, LEFT_COLOR),
    edge(BodyPart::LeftKnee, BodyPart::LeftAnkle, LEFT_COLOR),
    edge(BodyPart::RightHip, BodyPart::RightKnee, RIGHT_COLOR),
    edge(BodyPart::RightKnee, BodyPart::RightAnkle, RIGHT_COLOR),
];

/// High-confidence keypoints and bones of one pose, in absolute pixels.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SingleArrayPlan {
    pub keypoints: Vec<Point>,
    pub edges: Vec<[Point; 2]>,
    pub edge_colors: Vec<Color>,
    pub width: u32,
    pub height: u32,
}

/// Selects visible keypoints (`score > keypoint_threshold`) and the bones whose
/// endpoints are both visible, scaled to a `height` x `width` image.
pub fn plan_single_array(
    keypoints_with_scores: &KeypointsAndScores,
    height: u32,
    width: u32,
    keypoint_threshold: f32,
) -> SingleArrayPlan {
    let kps = keypoints_with_scores.keypoints();
    let absolute: [Point; NUM_KEYPOINTS] =
        std::array::from_fn(|i| Point::new(kps[i].x * width as f32, kps[i].y * height as f32));
    let visible = |part: BodyPart| kps[part.index()].score > keypoint_threshold;

    let keypoints = BodyPart::ALL
        .iter()
        .filter(|part| visible(**part))
        .map(|part| absolute[part.index()])
        .collect::<Vec<_>>();

    let mut edges = Vec::new();
    let mut edge_colors = Vec::new();
    for e in KEYPOINT_EDGES.iter().filter(|e| visible(e.a) && visible(e.b)) {
        edges.push([absolute[e.a.index()], absolute[e.b.index()]]);
        edge_colors.push(e.color);
    }

    log::debug!(
        "single-array plan: {} keypoints, {} edges above {keypoint_threshold}",
        keypoints.len(),
        edges.len()
    );

    SingleArrayPlan {
        keypoints,
        edges,
        edge_colors,
        width,
        height,
    }
}

#[derive(Clone, Debug)]
pub struct RenderConfig {
    /// Keypoints are drawn at `score >= keypoint_threshold`; bones need both ends `> keypoint_threshold`.
    pub keypoint_threshold: f32,
    /// Persons scoring below this are skipped entirely.
    pub instance_threshold: f32,
    pub keypoint_color: Color,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            keypoint_threshold: 0.05,
            instance_threshold: 0.1,
            keypoint_color: DEFAULT_KEYPOINT_COLOR,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DrawOp {
    Circle {
        center: Point,
        radius: i32,
        color: Color,
        thickness: i32,
    },
    Line {
        from: Point,
        to: Point,
        color: Color,
        thickness: i32,
    },
    Rectangle {
        start: Point,
        end: Point,
        color: Color,
        thickness: i32,
    },
}

/// Plans keypoints, bones and boxes for every person above the instance threshold.
pub fn plan_persons(persons: &[Person], cfg: &RenderConfig) -> Vec<DrawOp> {
    let mut ops = Vec::new();

    for person in persons {
        if person.score < cfg.instance_threshold {
            log::debug!(
                "skipping person with score {:.3} below {}",
                person.score,
                cfg.instance_threshold
            );
            continue;
        }

        let kps = &person.keypoints;

        for kp in kps.iter().filter(|kp| kp.score >= cfg.keypoint_threshold) {
            ops.push(DrawOp::Circle {
                center: kp.coordinate,
                radius: KEYPOINT_RADIUS,
                color: cfg.keypoint_color,
                thickness: KEYPOINT_THICKNESS,
            });
        }

        for e in &KEYPOINT_EDGES {
            let (a, b) = (&kps[e.a.index()], &kps[e.b.index()]);
            if a.score > cfg.keypoint_threshold && b.score > cfg.keypoint_threshold {
                ops.push(DrawOp::Line {
                    from: a.coordinate,
                    to: b.coordinate,
                    color: e.color,
                    thickness: EDGE_THICKNESS,
                });
            }
        }

        if let Some(bbox) = &person.bounding_box {
            ops.push(DrawOp::Rectangle {
                start: bbox.start_point,
                end: bbox.end_point,
                color: cfg.keypoint_color,
                thickness: BOX_THICKNESS,
            });
        }
    }

    ops
}

pub fn draw_plan<C: Canvas + ?Sized>(canvas: &mut C, ops: &[DrawOp]) {
    for op in ops {
        match *op {
            DrawOp::Circle {
                center,
                radius,
                color,
                thickness,
            } => canvas.draw_circle(center, radius, color, thickness),
            DrawOp::Line {
                from,
                to,
                color,
                thickness,
            } => canvas.draw_line(from, to, color, thickness),
            DrawOp::Rectangle {
                start,
                end,
                color,
                thickness,
            } => canvas.draw_rectangle(start, end, color, thickness),
        }
    }
}

/// Plans and draws all persons onto `canvas`.
pub fn visualize<C: Canvas + ?Sized>(canvas: &mut C, persons: &[Person], cfg: &RenderConfig) {
    let ops = plan_persons(persons, cfg);
    draw_plan(canvas, &ops);
}

/// Draws a single-array plan. Keypoints are clamped to the last pixel row/column.
pub fn draw_landmarks_edges<C: Canvas + ?Sized>(
    canvas: &mut C,
    plan: &SingleArrayPlan,
    keypoint_color: Color,
) {
    let max_x = plan.width.saturating_sub(1) as f32;
    let max_y = plan.height.saturating_sub(1) as f32;

    for kp in &plan.keypoints {
        let center = Point::new(kp.x.min(max_x), kp.y.min(max_y));
        canvas.draw_circle(center, KEYPOINT_RADIUS, keypoint_color, KEYPOINT_THICKNESS);
    }

    for ([from, to], color) in plan.edges.iter().zip(&plan.edge_colors) {
        canvas.draw_line(*from, *to, *color, EDGE_THICKNESS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::canvas::tests::RecordingCanvas;
    use crate::types::{BoundingBox, PersonKeypoint};

    fn keypoints_with(score: f32) -> KeypointsAndScores {
        let rows = vec![[0.5, 0.5, score]; NUM_KEYPOINTS];
        KeypointsAndScores::from_rows(&rows).unwrap()
    }

    fn person(score: f32, keypoint_score: f32, with_box: bool) -> Person {
        Person {
            keypoints: std::array::from_fn(|i| PersonKeypoint {
                body_part: BodyPart::ALL[i],
                coordinate: Point::new(10.0 * i as f32, 5.0 * i as f32),
                score: keypoint_score,
            }),
            bounding_box: with_box.then(|| BoundingBox {
                start_point: Point::new(1.0, 2.0),
                end_point: Point::new(100.0, 200.0),
            }),
            score,
        }
    }

    fn count(ops: &[DrawOp]) -> (usize, usize, usize) {
        ops.iter().fold((0, 0, 0), |(c, l, r), op| match op {
            DrawOp::Circle { .. } => (c + 1, l, r),
            DrawOp::Line { .. } => (c, l + 1, r),
            DrawOp::Rectangle { .. } => (c, l, r + 1),
        })
    }

    #[test]
    fn edge_table_is_canonical() {
        assert_eq!(KEYPOINT_EDGES.len(), 18);
        let first = KEYPOINT_EDGES[0];
        assert_eq!((first.a, first.b, first.color), (BodyPart::Nose, BodyPart::LeftEye, [147, 20, 255]));
        let shoulders = KEYPOINT_EDGES[10];
        assert_eq!((shoulders.a.index(), shoulders.b.index()), (5, 6));
        assert_eq!(shoulders.color, [0, 255, 255]);
        for e in &KEYPOINT_EDGES {
            assert!(e.a.index() < e.b.index());
        }
    }

    #[test]
    fn single_array_scales_to_pixels() {
        let mut rows = vec![[0.0, 0.0, 0.0]; NUM_KEYPOINTS];
        rows[0] = [0.5, 0.5, 0.9];
        let kps = KeypointsAndScores::from_rows(&rows).unwrap();

        let plan = plan_single_array(&kps, 480, 640, SINGLE_ARRAY_KEYPOINT_THRESHOLD);
        assert_eq!(plan.keypoints, vec![Point::new(320.0, 240.0)]);
        assert!(plan.edges.is_empty());
        assert!(plan.edge_colors.is_empty());
    }

    #[test]
    fn single_array_threshold_is_exclusive() {
        let plan = plan_single_array(&keypoints_with(0.11), 100, 100, 0.11);
        assert!(plan.keypoints.is_empty());
        assert!(plan.edges.is_empty());

        let plan = plan_single_array(&keypoints_with(0.110_000_1), 100, 100, 0.11);
        assert_eq!(plan.keypoints.len(), NUM_KEYPOINTS);
        assert_eq!(plan.edges.len(), KEYPOINT_EDGES.len());
        assert_eq!(plan.edge_colors.len(), plan.edges.len());
    }

    #[test]
    fn single_array_edge_needs_both_endpoints() {
        let mut rows = vec![[0.2, 0.4, 0.9]; NUM_KEYPOINTS];
        rows[BodyPart::LeftEye.index()][2] = 0.05;
        let kps = KeypointsAndScores::from_rows(&rows).unwrap();

        let plan = plan_single_array(&kps, 10, 10, SINGLE_ARRAY_KEYPOINT_THRESHOLD);
        assert_eq!(plan.keypoints.len(), NUM_KEYPOINTS - 1);
        // nose-left_eye and left_eye-left_ear are dropped
        assert_eq!(plan.edges.len(), KEYPOINT_EDGES.len() - 2);
        assert_eq!(plan.edge_colors[0], RIGHT_COLOR);
    }

    #[test]
    fn persons_threshold_is_inclusive_for_keypoints_only() {
        let ops = plan_persons(&[person(0.9, 0.05, false)], &RenderConfig::default());
        let (circles, lines, rects) = count(&ops);
        assert_eq!(circles, NUM_KEYPOINTS);
        assert_eq!(lines, 0);
        assert_eq!(rects, 0);
    }

    #[test]
    fn low_scoring_person_is_skipped() {
        let ops = plan_persons(&[person(0.09, 0.99, true)], &RenderConfig::default());
        assert!(ops.is_empty());
    }

    #[test]
    fn persons_plan_keypoints_edges_and_box_in_order() {
        let cfg = RenderConfig {
            keypoint_color: [1, 2, 3],
            ..RenderConfig::default()
        };
        let ops = plan_persons(&[person(0.1, 0.8, true), person(0.5, 0.8, false)], &cfg);
        assert_eq!(count(&ops), (2 * NUM_KEYPOINTS, 2 * KEYPOINT_EDGES.len(), 1));

        let per_person = NUM_KEYPOINTS + KEYPOINT_EDGES.len() + 1;
        assert!(matches!(ops[0], DrawOp::Circle { color: [1, 2, 3], .. }));
        assert!(matches!(ops[NUM_KEYPOINTS], DrawOp::Line { .. }));
        assert_eq!(
            ops[per_person - 1],
            DrawOp::Rectangle {
                start: Point::new(1.0, 2.0),
                end: Point::new(100.0, 200.0),
                color: [1, 2, 3],
                thickness: BOX_THICKNESS,
            }
        );
    }

    #[test]
    fn visualize_replays_plan_on_canvas() {
        let mut canvas = RecordingCanvas::default();
        let persons = [person(0.8, 0.8, true)];
        visualize(&mut canvas, &persons, &RenderConfig::default());
        assert_eq!(canvas.ops, plan_persons(&persons, &RenderConfig::default()));
    }

    #[test]
    fn landmarks_are_clamped_to_image() {
        let plan = SingleArrayPlan {
            keypoints: vec![Point::new(640.0, 480.0)],
            edges: vec![[Point::new(0.0, 0.0), Point::new(640.0, 480.0)]],
            edge_colors: vec![CENTER_COLOR],
            width: 640,
            height: 480,
        };
        let mut canvas = RecordingCanvas::default();
        draw_landmarks_edges(&mut canvas, &plan, DEFAULT_KEYPOINT_COLOR);

        assert_eq!(
            canvas.ops,
            vec![
                DrawOp::Circle {
                    center: Point::new(639.0, 479.0),
                    radius: KEYPOINT_RADIUS,
                    color: DEFAULT_KEYPOINT_COLOR,
                    thickness: KEYPOINT_THICKNESS,
                },
                DrawOp::Line {
                    from: Point::new(0.0, 0.0),
                    to: Point::new(640.0, 480.0),
                    color: CENTER_COLOR,
                    thickness: EDGE_THICKNESS,
                },
            ]
        );
    }
}
