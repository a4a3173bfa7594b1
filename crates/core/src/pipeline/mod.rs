pub mod annotate_image_use_case;
pub mod frame_buffer;
pub mod frame_pipeline;
pub mod live_session;
pub mod pipeline_stats;
