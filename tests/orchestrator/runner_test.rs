//! End-to-end tests for the tool runner.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use toolrun::config::RunnerConfig;
use toolrun::diag::Severity;
use toolrun::orchestrator::{CollectingSink, MessageImportance, ToolInvocation, ToolRunError, ToolRunner};

fn runner_with_sink() -> (ToolRunner, Arc<CollectingSink>) {
    let sink = Arc::new(CollectingSink::new());
    let runner = ToolRunner::new(RunnerConfig::default(), sink.clone());
    (runner, sink)
}

fn sh(script: &str) -> ToolInvocation {
    ToolInvocation::new("sh").args(["-c", script])
}

#[tokio::test]
async fn compiler_error_becomes_one_diagnostic() {
    let (runner, sink) = runner_with_sink();
    let invocation = sh("echo 'a.cs(10,5): error CS0001: bad thing'; exit 1");

    let outcome = runner.run(&invocation).await.expect("run");
    assert!(!outcome.success);
    assert_eq!(outcome.exit_code, 1);
    assert_eq!(outcome.errors, 1);
    assert_eq!(outcome.warnings, 0);

    let diagnostics = sink.diagnostics();
    assert_eq!(diagnostics.len(), 1, "no synthesized extra error expected");
    let diag = &diagnostics[0];
    assert_eq!(diag.origin, "a.cs");
    assert_eq!(diag.start_line, 10);
    assert_eq!(diag.start_col, 5);
    assert_eq!(diag.severity, Severity::Error);
    assert_eq!(diag.code, "CS0001");
    assert_eq!(diag.message, "bad thing");
}

#[tokio::test]
async fn silent_failure_synthesizes_generic_error() {
    let (runner, sink) = runner_with_sink();
    let outcome = runner.run(&sh("exit 2")).await.expect("run");

    assert!(!outcome.success);
    assert_eq!(outcome.exit_code, 2);
    assert_eq!(outcome.errors, 1);

    let diagnostics = sink.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].origin, "sh");
    assert!(diagnostics[0].message.contains("exited with code 2"));
}

#[tokio::test]
async fn success_hook_overrides_nonzero_exit() {
    let (runner, sink) = runner_with_sink();
    let invocation = sh("exit 3").success_when(|code| code == 3);

    let outcome = runner.run(&invocation).await.expect("run");
    assert!(outcome.success);
    assert_eq!(outcome.exit_code, 3);
    assert!(sink.diagnostics().is_empty(), "successful run must not synthesize errors");
}

#[tokio::test]
async fn zero_exit_with_warnings_succeeds() {
    let (runner, sink) = runner_with_sink();
    let invocation = sh("echo 'a.cs(3): warning CS0168: unused variable'; exit 0");

    let outcome = runner.run(&invocation).await.expect("run");
    assert!(outcome.success);
    assert_eq!(outcome.warnings, 1);
    assert_eq!(outcome.errors, 0);
    assert_eq!(sink.diagnostics()[0].severity, Severity::Warning);
}

#[tokio::test]
async fn plain_output_uses_per_stream_importance() {
    let (runner, sink) = runner_with_sink();
    let invocation = sh("echo chatter; echo noise >&2");

    let outcome = runner.run(&invocation).await.expect("run");
    assert!(outcome.success);

    let messages = sink.messages();
    assert!(messages.contains(&(MessageImportance::Low, "chatter".to_string())));
    assert!(messages.contains(&(MessageImportance::Normal, "noise".to_string())));
}

#[tokio::test]
async fn missing_origin_defaults_to_tool_name() {
    let (runner, sink) = runner_with_sink();
    let invocation = sh("echo 'error CS5001: no entry point'; exit 1");

    runner.run(&invocation).await.expect("run");
    assert_eq!(sink.diagnostics()[0].origin, "sh");
}

#[tokio::test]
async fn final_line_without_terminator_is_flushed() {
    let (runner, sink) = runner_with_sink();
    let invocation = sh("printf 'a.cs(1): error X1: truncated'; exit 1");

    let outcome = runner.run(&invocation).await.expect("run");
    assert_eq!(outcome.errors, 1);
    assert_eq!(sink.diagnostics()[0].message, "truncated");
}

#[tokio::test]
async fn status_banners_are_suppressed() {
    let (runner, sink) = runner_with_sink();
    let invocation = sh(
        "echo 'Compilation failed: 1 error(s)'; echo 'Writing symbol file a.mdb'; exit 2",
    );

    let outcome = runner.run(&invocation).await.expect("run");
    assert!(!outcome.success);
    assert!(sink.messages().is_empty());
    // Only the synthesized failure remains.
    assert_eq!(sink.diagnostics().len(), 1);
    assert!(sink.diagnostics()[0].message.contains("exited with code 2"));
}

#[tokio::test]
async fn fatal_banner_aggregates_stack_trace() {
    let (runner, sink) = runner_with_sink();
    let invocation = sh(
        "echo 'Unhandled Exception: System.NullReferenceException'; \
         echo '  at Compiler.Main()'; \
         echo '  at Driver.Run()'; \
         exit 134",
    );

    let outcome = runner.run(&invocation).await.expect("run");
    assert!(!outcome.success);
    assert_eq!(outcome.errors, 1);

    let diagnostics = sink.diagnostics();
    assert_eq!(diagnostics.len(), 1, "stack trace must not fan out");
    let diag = &diagnostics[0];
    assert!(diag.is_error());
    assert!(diag.message.contains("System.NullReferenceException"));
    assert!(diag.message.contains("at Compiler.Main()"));
    assert!(diag.message.contains("at Driver.Run()"));
    assert!(sink.messages().is_empty());
}

#[tokio::test]
async fn timeout_terminates_and_fails_the_run() {
    let (runner, sink) = runner_with_sink();
    let invocation = sh("sleep 30").timeout(Duration::from_millis(200));

    let started = std::time::Instant::now();
    let outcome = runner.run(&invocation).await.expect("run");
    assert!(started.elapsed() < Duration::from_secs(20));
    assert!(!outcome.success);
    assert_eq!(outcome.errors, 1);
    assert!(sink.diagnostics()[0].message.contains("timed out"));
}

#[tokio::test]
async fn unknown_tool_fails_fast() {
    let (runner, sink) = runner_with_sink();
    let invocation = ToolInvocation::new("definitely-not-a-real-tool-toolrun");

    let err = runner.run(&invocation).await.unwrap_err();
    assert!(matches!(err, ToolRunError::ToolNotFound(_)));
    assert!(sink.diagnostics().is_empty());
    assert!(sink.messages().is_empty());
}

#[tokio::test]
async fn response_file_reaches_the_tool() {
    let (runner, sink) = runner_with_sink();
    // `cat` the response file via the derived @-switch.
    let invocation = ToolInvocation::new("sh")
        .args(["-c", "cat \"${1#@}\"", "run"])
        .response_payload("payload-line error E77: from response file")
        .response_switch_format(|path| format!("@{}", path.display()));

    let outcome = runner.run(&invocation).await.expect("run");
    assert!(outcome.success);
    let diagnostics = sink.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, "E77");
}

#[tokio::test]
async fn response_file_is_deleted_after_launch_failure() {
    let (runner, _sink) = runner_with_sink();
    let seen_path: Arc<Mutex<Option<PathBuf>>> = Arc::new(Mutex::new(None));
    let capture = seen_path.clone();

    // A plain data file resolves (it exists) but is not executable, so the
    // spawn itself fails after the response file was written.
    let fake_tool = tempfile::NamedTempFile::new().expect("tempfile");
    std::fs::write(fake_tool.path(), "not a binary").expect("write");
    let invocation = ToolInvocation::new(fake_tool.path().to_string_lossy().into_owned())
        .response_payload("some args")
        .response_switch_format(move |path| {
            *capture.lock().expect("lock") = Some(path.to_path_buf());
            format!("@{}", path.display())
        });

    let err = runner.run(&invocation).await.unwrap_err();
    assert!(matches!(err, ToolRunError::Launch { .. }));

    let path = seen_path.lock().expect("lock").clone().expect("switch format invoked");
    assert!(!path.exists(), "response file must be deleted on the failure path");
}

#[tokio::test]
async fn response_file_is_deleted_after_success() {
    let (runner, _sink) = runner_with_sink();
    let seen_path: Arc<Mutex<Option<PathBuf>>> = Arc::new(Mutex::new(None));
    let capture = seen_path.clone();

    let invocation = sh("exit 0")
        .response_payload("args")
        .response_switch_format(move |path| {
            *capture.lock().expect("lock") = Some(path.to_path_buf());
            format!("@{}", path.display())
        });

    let outcome = runner.run(&invocation).await.expect("run");
    assert!(outcome.success);
    let path = seen_path.lock().expect("lock").clone().expect("switch format invoked");
    assert!(!path.exists());
}

#[tokio::test]
async fn per_call_env_overrides_reach_the_tool() {
    let (runner, sink) = runner_with_sink();
    let invocation = sh("echo \"var=$TOOLRUN_IT_VAR\"").env("TOOLRUN_IT_VAR", "hello");

    runner.run(&invocation).await.expect("run");
    assert!(sink
        .messages()
        .iter()
        .any(|(_, text)| text == "var=hello"));
}

#[tokio::test]
async fn config_env_is_overridden_by_per_call_env() {
    let sink = Arc::new(CollectingSink::new());
    let mut config = RunnerConfig::default();
    config
        .env
        .set
        .insert("TOOLRUN_LAYERED".to_string(), "from-config".to_string());
    let runner = ToolRunner::new(config, sink.clone());

    let invocation = sh("echo \"layered=$TOOLRUN_LAYERED\"").env("TOOLRUN_LAYERED", "from-call");
    runner.run(&invocation).await.expect("run");
    assert!(sink
        .messages()
        .iter()
        .any(|(_, text)| text == "layered=from-call"));
}

#[tokio::test]
async fn working_directory_is_applied() {
    let (runner, sink) = runner_with_sink();
    let dir = tempfile::tempdir().expect("tempdir");
    let expected = dir.path().canonicalize().expect("canonicalize");

    let invocation = sh("pwd").working_dir(dir.path());
    runner.run(&invocation).await.expect("run");

    let messages = sink.messages();
    assert!(
        messages
            .iter()
            .any(|(_, text)| PathBuf::from(text).canonicalize().ok() == Some(expected.clone())),
        "pwd output should match the working dir: {messages:?}"
    );
}

#[tokio::test]
async fn stdin_payload_is_piped() {
    let (runner, sink) = runner_with_sink();
    let invocation = sh("read line; echo \"got $line\"").stdin("from the engine\n");

    runner.run(&invocation).await.expect("run");
    assert!(sink
        .messages()
        .iter()
        .any(|(_, text)| text == "got from the engine"));
}

#[tokio::test]
async fn mixed_output_keeps_per_stream_line_order() {
    let (runner, sink) = runner_with_sink();
    let invocation = sh("echo one; echo 'a.cs(1): error E1: first'; echo two");

    runner.run(&invocation).await.expect("run");

    let messages: Vec<String> = sink.messages().into_iter().map(|(_, t)| t).collect();
    let one = messages.iter().position(|t| t == "one").expect("one");
    let two = messages.iter().position(|t| t == "two").expect("two");
    assert!(one < two);
    assert_eq!(sink.diagnostics().len(), 1);
}
