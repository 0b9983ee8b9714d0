//! Orchestrator module tests.

mod runner_test;

/// Verify all public orchestrator types are exported from the library.
#[test]
fn test_all_orchestrator_types_exported() {
    use std::sync::Arc;
    use toolrun::config::RunnerConfig;
    use toolrun::orchestrator::{
        CollectingSink, DiagnosticSink, LineAccumulator, MessageImportance, OutputClassifier,
        RunOutcome, ToolInvocation, ToolRunError, ToolRunner,
    };

    let _ = LineAccumulator::new();
    let _ = ToolInvocation::new("cc");

    let sink: Arc<CollectingSink> = Arc::new(CollectingSink::new());
    let _ = ToolRunner::new(RunnerConfig::default(), sink.clone());
    let _ = OutputClassifier::new(
        "cc",
        MessageImportance::Low,
        MessageImportance::Normal,
        sink as Arc<dyn DiagnosticSink>,
    );

    let _: fn(String) -> ToolRunError = ToolRunError::ToolNotFound;
    let outcome = RunOutcome {
        success: true,
        exit_code: 0,
        errors: 0,
        warnings: 0,
    };
    assert!(outcome.success);
}
