pub mod text_result_sink;
