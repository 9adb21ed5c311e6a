//! Runs GeminiCliService against a stand-in shell script.
#![cfg(unix)]

use std::time::{Duration, Instant};

use murmur_core::generation::{GenerationError, GenerationService};
use murmur_interaction::GeminiCliService;
use tempfile::TempDir;

const FAKE_CLI: &str = r#"
# $1=--model $2=<model> $3=--prompt $4=<prompt>
case "$2" in
  busy-model) echo "Error: 429 Too Many Requests" >&2; exit 1 ;;
  broken-model) echo "permission denied" >&2; exit 3 ;;
  slow-model) sleep 10 ;;
  *) printf '  reply from %s to: %s\n\n' "$2" "$4" ;;
esac
"#;

fn fake_service(dir: &TempDir) -> GeminiCliService {
    let script = dir.path().join("fake-gemini.sh");
    std::fs::write(&script, FAKE_CLI).unwrap();
    GeminiCliService::new("sh").with_leading_args([script.to_string_lossy().into_owned()])
}

#[tokio::test]
async fn test_success_returns_trimmed_stdout() {
    let dir = TempDir::new().unwrap();
    let service = fake_service(&dir);

    let outcome = service
        .generate("hello there", "gemini-2.5-flash", Duration::from_secs(5))
        .await
        .unwrap();

    assert!(outcome.is_success());
    assert_eq!(outcome.text, "reply from gemini-2.5-flash to: hello there");
}

#[tokio::test]
async fn test_non_zero_exit_reports_stderr() {
    let dir = TempDir::new().unwrap();
    let service = fake_service(&dir);

    let outcome = service
        .generate("hi", "busy-model", Duration::from_secs(5))
        .await
        .unwrap();
    assert!(!outcome.is_success());
    assert_eq!(outcome.exit_status, Some(1));
    assert!(outcome.stderr.contains("429"));

    let outcome = service
        .generate("hi", "broken-model", Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(outcome.exit_status, Some(3));
    assert!(outcome.stderr.contains("permission denied"));
}

#[tokio::test]
async fn test_missing_binary_is_a_spawn_error() {
    let service = GeminiCliService::new("/nonexistent/murmur-gemini-cli");
    let err = service
        .generate("hi", "gemini-2.5-pro", Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::Spawn { .. }));
}

#[tokio::test]
async fn test_slow_child_times_out() {
    let dir = TempDir::new().unwrap();
    let service = fake_service(&dir);

    let started = Instant::now();
    let err = service
        .generate("hi", "slow-model", Duration::from_millis(200))
        .await
        .unwrap_err();

    assert_eq!(err, GenerationError::TimedOut(Duration::from_millis(200)));
    assert!(started.elapsed() < Duration::from_secs(5));
}
