pub mod canvas;
pub mod resize;
pub mod skeleton;

// Re-exports for convenience
pub use canvas::{Canvas, RgbaCanvas};
pub use resize::{ResizedImage, keep_aspect_ratio_resize};
pub use skeleton::{
    DrawOp, Edge, KEYPOINT_EDGES, RenderConfig, SINGLE_ARRAY_KEYPOINT_THRESHOLD, SingleArrayPlan,
    draw_landmarks_edges, draw_plan, plan_persons, plan_single_array, visualize,
};
