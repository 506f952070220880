use ort::execution_providers::ExecutionProviderDispatch;

/// Hardware execution providers to try before ONNX Runtime's CPU default.
///
/// Registration failures are non-fatal in `ort`; the session silently falls
/// back to CPU.
pub fn preferred_execution_providers() -> Vec<ExecutionProviderDispatch> {
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
        Vec::new()
    }
}
