pub mod landmark_renderer;
pub mod stroke_style;
