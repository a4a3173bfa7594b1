pub mod nokhwa_camera;
pub mod still_image_source;
