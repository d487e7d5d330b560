//! Integration tests for the collector CLI commands.

use clap::Parser;
use collector_cli::cli::Cli;
use collector_cli::commands::config::Config;
use collector_cli::commands::run::execute;
use collector_cli::runner::execute_command;
use collector_core::cli::{ExitCode, OutputFormat};
use collector_wasm_runtime::RuntimeConfig;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

/// Guest whose `main` awaits promise 7 into slot 100, whose `failing`
/// entry point returns 2 and whose `spin` entry point never returns.
const GUEST: &str = r#"
    (module
        (import "collector-web" "startAwaiting" (func $start_awaiting (param i32 i32)))
        (memory (export "memory") 1)
        (func (export "main") (result i32)
            (call $start_awaiting (i32.const 7) (i32.const 100))
            (i32.const 0)
        )
        (func (export "failing") (result i32)
            (i32.const 2)
        )
        (func (export "spin") (result i32)
            (loop $l (br $l))
            (i32.const 0)
        )
        (func (export "onPromiseCompleted") (param i32 i32)
            (i32.store (i32.const 200) (local.get 1))
        )
    )
"#;

fn write_guest(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("guest.wasm");
    fs::write(&path, wat::parse_str(GUEST).unwrap()).unwrap();
    path
}

fn write_fixture(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("promises.toml");
    fs::write(&path, content).unwrap();
    path
}

#[tokio::test]
async fn test_run_settles_fixture_promise() {
    let dir = TempDir::new().unwrap();
    let module = write_guest(&dir);
    let fixture = write_fixture(&dir, "[[promise]]\nid = 7\nresolve = \"ok\"\ndelay_ms = 5\n");

    let result = execute(&module, "main", Some(&fixture), RuntimeConfig::default())
        .await
        .unwrap()
        .expect("guest should succeed");

    assert_eq!(result.entry, "main");
    assert_eq!(result.report.exit_code, 0);
    assert_eq!(result.report.settled, 1);
    assert_eq!(result.report.bridge.fulfilled, 1);
}

#[tokio::test]
async fn test_run_rejected_promise_is_not_an_error() {
    let dir = TempDir::new().unwrap();
    let module = write_guest(&dir);
    let fixture = write_fixture(&dir, "[[promise]]\nid = 7\nreject = \"boom\"\n");

    let result = execute(&module, "main", Some(&fixture), RuntimeConfig::default())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(result.report.bridge.rejected, 1);
}

#[tokio::test]
async fn test_run_accepts_text_format_module() {
    let dir = TempDir::new().unwrap();
    let module = dir.path().join("guest.wat");
    fs::write(&module, GUEST).unwrap();

    let result = execute(&module, "main", None, RuntimeConfig::default())
        .await
        .unwrap()
        .unwrap();

    // No fixture: the awaited id is unknown and ignored.
    assert_eq!(result.report.bridge.unknown_promise, 1);
}

#[tokio::test]
async fn test_run_nonzero_exit_code() {
    let dir = TempDir::new().unwrap();
    let cli = Cli::parse_from([
        "collector",
        "run",
        write_guest(&dir).to_str().unwrap(),
        "--entry",
        "failing",
    ]);

    let code = execute_command(cli.command, OutputFormat::Json, &Config::default())
        .await
        .unwrap();
    assert_eq!(code, ExitCode::GUEST_ERROR);
}

#[tokio::test]
async fn test_run_settle_timeout_exit_code() {
    let dir = TempDir::new().unwrap();
    let module = write_guest(&dir);
    let fixture = write_fixture(&dir, "[[promise]]\nid = 7\nresolve = 1\ndelay_ms = 5000\n");

    let config = RuntimeConfig::builder()
        .settle_timeout(Duration::from_millis(50))
        .build();
    let outcome = execute(&module, "main", Some(&fixture), config).await.unwrap();

    assert_eq!(outcome.unwrap_err(), ExitCode::TIMEOUT);
}

#[tokio::test]
async fn test_run_looping_entry_times_out() {
    let dir = TempDir::new().unwrap();
    let module = write_guest(&dir);

    let config = RuntimeConfig::builder()
        .entry_timeout(Duration::from_millis(100))
        .build();
    let outcome = execute(&module, "spin", None, config).await.unwrap();

    assert_eq!(outcome.unwrap_err(), ExitCode::TIMEOUT);
}

#[tokio::test]
async fn test_run_invalid_fixture_is_error() {
    let dir = TempDir::new().unwrap();
    let module = write_guest(&dir);
    let fixture = write_fixture(&dir, "[[promise]]\nid = 7\n");

    assert!(
        execute(&module, "main", Some(&fixture), RuntimeConfig::default())
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_hygiene_commands_fix_files() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("notes.md");
    fs::write(&file, "# Notes   \n\ntext\t").unwrap();
    let file_arg = file.to_str().unwrap();

    for command in ["trailing-whitespace", "end-of-file"] {
        let cli = Cli::parse_from(["collector", command, file_arg]);
        let code = execute_command(cli.command, OutputFormat::Pretty, &Config::default())
            .await
            .unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
    }

    assert_eq!(fs::read_to_string(&file).unwrap(), "# Notes\n\ntext\n");
}

#[tokio::test]
async fn test_hygiene_command_without_files() {
    let cli = Cli::parse_from(["collector", "end-of-file"]);
    let code = execute_command(cli.command, OutputFormat::Pretty, &Config::default())
        .await
        .unwrap();
    assert_eq!(code, ExitCode::USAGE);
}
