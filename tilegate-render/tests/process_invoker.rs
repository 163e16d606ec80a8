//! Runs the real ProcessInvoker against small shell-script renderers.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tempfile::TempDir;
use tilegate_core::{ImageSubtype, RenderError, RequestQuery};
use tilegate_render::{OutputCapture, ParserKind, ProcessInvoker, RenderInvoker};

fn script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("script write should succeed");
    let mut perms = std::fs::metadata(&path)
        .expect("metadata should succeed")
        .permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("chmod should succeed");
    path
}

fn query(raw: &str) -> RequestQuery {
    RequestQuery::new(raw).expect("non-empty query")
}

#[tokio::test]
async fn test_query_passed_as_cgi_argument() -> Result<(), RenderError> {
    let dir = TempDir::new().expect("TempDir creation should succeed");
    let renderer = script(&dir, "echo.sh", r#"printf '%s|%s' "$#" "$1""#);

    let output = ProcessInvoker::new(renderer)
        .invoke(&query("SERVICE=WMS&LAYERS=a b"))
        .await?;
    assert_eq!(output, b"1|QUERY_STRING=SERVICE=WMS&LAYERS=a b".to_vec());
    Ok(())
}

#[tokio::test]
async fn test_png_output_parses() -> Result<(), RenderError> {
    let dir = TempDir::new().expect("TempDir creation should succeed");
    let renderer = script(
        &dir,
        "png.sh",
        r#"printf 'Content-Type: image/png\r\n\r\n'; printf 'PNGDATA'"#,
    );

    let output = ProcessInvoker::new(renderer).invoke(&query("LAYERS=a")).await?;
    let tile = ParserKind::Literal.build().parse(&output)?;
    assert_eq!(tile.subtype, ImageSubtype::Png);
    assert_eq!(tile.bytes, b"PNGDATA".to_vec());
    Ok(())
}

#[tokio::test]
async fn test_non_zero_exit_is_execution_failure() {
    let dir = TempDir::new().expect("TempDir creation should succeed");
    let renderer = script(&dir, "fail.sh", "printf 'partial'; exit 3");

    let result = ProcessInvoker::new(renderer).invoke(&query("LAYERS=a")).await;
    match result {
        Err(RenderError::ExecutionFailed { detail }) => assert!(detail.contains('3'), "{}", detail),
        other => panic!("expected ExecutionFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_combined_capture_includes_stderr() -> Result<(), RenderError> {
    let dir = TempDir::new().expect("TempDir creation should succeed");
    let renderer = script(&dir, "both.sh", "printf 'out'; printf 'err' >&2");

    let combined = ProcessInvoker::new(&renderer).invoke(&query("x=1")).await?;
    assert_eq!(combined, b"outerr".to_vec());

    let stdout_only = ProcessInvoker::new(&renderer)
        .with_capture(OutputCapture::Stdout)
        .invoke(&query("x=1"))
        .await?;
    assert_eq!(stdout_only, b"out".to_vec());
    Ok(())
}

#[tokio::test]
async fn test_error_page_on_stderr_is_detected_when_combined() {
    let dir = TempDir::new().expect("TempDir creation should succeed");
    let renderer = script(
        &dir,
        "stderr_page.sh",
        r#"printf '<html><title>MapServer Message</title><body>msLoadMap(): missing map file</body></html>' >&2"#,
    );

    let output = ProcessInvoker::new(renderer)
        .invoke(&query("MAP=/missing.map"))
        .await
        .expect("renderer exits zero");
    assert_eq!(
        ParserKind::Literal.build().parse(&output),
        Err(RenderError::Rejected {
            message: "msLoadMap(): missing map file".to_string()
        })
    );
}

#[tokio::test]
async fn test_timeout_kills_renderer() {
    let dir = TempDir::new().expect("TempDir creation should succeed");
    let renderer = script(&dir, "slow.sh", "exec sleep 10");

    let started = Instant::now();
    let result = ProcessInvoker::new(renderer)
        .with_timeout(Some(Duration::from_millis(200)))
        .invoke(&query("LAYERS=slow"))
        .await;

    assert_eq!(
        result,
        Err(RenderError::Timeout {
            after: Duration::from_millis(200)
        })
    );
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_check_accepts_existing_renderer() {
    let dir = TempDir::new().expect("TempDir creation should succeed");
    let renderer = script(&dir, "ok.sh", "exit 0");
    assert_eq!(ProcessInvoker::new(renderer).check().await, Ok(()));
}
