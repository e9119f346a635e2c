pub mod detection;
pub mod detection_filter;
pub mod object_detector;
pub mod object_tracker;
