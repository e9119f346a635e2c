pub mod pipeline_logger;
pub mod resource_guard;
pub mod session_config;
pub mod session_error;
pub mod track_video_use_case;
