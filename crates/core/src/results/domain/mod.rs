pub mod result_record;
pub mod result_sink;
