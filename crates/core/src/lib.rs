pub mod annotation;
pub mod config;
pub mod detection;
pub mod pipeline;
pub mod results;
pub mod shared;
pub mod video;
