/// Return the ONNX execution providers to register for a session.
///
/// With `accelerated = false` the list is empty and ONNX Runtime runs on the
/// CPU. Otherwise the platform provider is requested; ONNX Runtime falls back
/// to CPU if it is unavailable.
pub fn execution_providers(
    accelerated: bool,
) -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    if !accelerated {
        return vec![];
    }
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        log::warn!("No accelerated execution provider on this platform, using CPU");
        vec![]
    }
}
