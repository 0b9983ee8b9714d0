//! Process module tests.


/// Verify all public process types are exported from the library.
#[test]
fn test_all_process_types_exported() {
    use toolrun::process::{
        LaunchSpec, OutputChunk, RunningTool, SpawnError, StreamSource, DEFAULT_CHANNEL_BUFFER,
        DRAIN_CHUNK_SIZE, TERMINATE_GRACE,
    };

    let spec = LaunchSpec::new("sh");
    assert!(spec.capture_stderr);
    assert!(DRAIN_CHUNK_SIZE > 0);
    assert!(DEFAULT_CHANNEL_BUFFER > 0);
    assert!(TERMINATE_GRACE.as_secs() >= 1);

    let chunk = OutputChunk {
        source: StreamSource::Stdout,
        data: b"x".to_vec(),
    };
    assert_eq!(chunk.source.to_string(), "stdout");
    assert_eq!(StreamSource::Stderr.to_string(), "stderr");

    let _: fn() -> SpawnError = || SpawnError::NotFound;
    let _: fn(tokio::process::Child, tokio::sync::mpsc::Sender<OutputChunk>) -> RunningTool =
        RunningTool::start;
}
