use std::path::Path;

/// Return the preferred ONNX execution providers for the current platform.
///
/// An empty list means ort's default CPU provider.
pub fn preferred_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
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
        vec![]
    }
}

/// Load an ONNX model with the platform's preferred providers registered.
///
/// ort falls back to CPU on its own when a registered provider fails to
/// initialize.
pub fn load_session(
    model_path: &Path,
) -> Result<ort::session::Session, Box<dyn std::error::Error>> {
    let session = ort::session::Session::builder()?
        .with_execution_providers(preferred_execution_providers())?
        .commit_from_file(model_path)?;
    Ok(session)
}
