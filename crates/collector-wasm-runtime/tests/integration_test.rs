//! Integration tests for the runtime with real guest modules.

use collector_bridge::{HostPromise, PromiseBridge, PromiseState};
use collector_core::{PromiseId, ValueRef};
use collector_wasm_runtime::{Runtime, RuntimeConfig};
use serde_json::{Value, json};
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("collector_wasm_runtime=debug,collector_bridge=debug")
        .with_test_writer()
        .try_init();
}

fn awaiting_guest() -> Vec<u8> {
    wat::parse_str(include_str!("wasm/awaiting_guest.wat")).expect("Failed to parse WAT")
}

fn bridge_with(id: u32, promise: HostPromise) -> PromiseBridge<wasmtime::Instance> {
    let mut bridge = PromiseBridge::new();
    bridge
        .insert_promise(PromiseId::new(id), promise)
        .expect("Failed to register promise");
    bridge
}

#[tokio::test]
async fn test_resolved_promise_is_delivered_to_guest() {
    init_tracing();

    let runtime = Runtime::new(RuntimeConfig::default()).unwrap();
    let mut session = runtime
        .instantiate(&awaiting_guest(), bridge_with(7, HostPromise::resolved(json!("ok"))))
        .await
        .expect("Failed to instantiate guest");

    assert_eq!(session.call("main").await.unwrap(), 0);
    assert_eq!(session.promise_bridge().pending(), 1);
    assert_eq!(session.run_until_idle().await.unwrap(), 1);

    let handle = session.read_u32(100).unwrap();
    assert_ne!(handle, 0, "slot must hold a non-null handle");
    assert_eq!(session.value(ValueRef::new(handle)), Some(&json!("ok")));

    assert_eq!(session.read_u32(200).unwrap(), 7);
    assert_eq!(session.read_u32(204).unwrap(), 1);
    assert_eq!(session.read_u32(208).unwrap(), 1);
    // `"ok"` as JSON text is four bytes.
    assert_eq!(session.read_u32(212).unwrap(), 4);
    assert_eq!(session.read_u32(216).unwrap(), 4);

    assert_eq!(
        session.promise_bridge().state(PromiseId::new(7)),
        Some(PromiseState::Completed)
    );
    assert_eq!(session.stats().fulfilled, 1);
}

#[tokio::test]
async fn test_rejected_promise_signals_failure() {
    init_tracing();

    let runtime = Runtime::new(RuntimeConfig::default()).unwrap();
    let mut session = runtime
        .instantiate(&awaiting_guest(), bridge_with(7, HostPromise::rejected(json!("boom"))))
        .await
        .unwrap();

    session.call("main").await.unwrap();
    session.run_until_idle().await.unwrap();

    let handle = session.read_u32(100).unwrap();
    assert_eq!(session.value(ValueRef::new(handle)), Some(&json!("boom")));
    assert_eq!(session.read_u32(200).unwrap(), 7);
    assert_eq!(session.read_u32(204).unwrap(), 0, "success flag must be false");
    assert_eq!(session.stats().rejected, 1);
}

#[tokio::test]
async fn test_execute_reports_settlements() {
    init_tracing();

    let runtime = Runtime::new(RuntimeConfig::default()).unwrap();
    let report = runtime
        .execute(&awaiting_guest(), "main", bridge_with(7, HostPromise::resolved(json!(1))))
        .await
        .unwrap();

    assert_eq!(report.exit_code, 0);
    assert_eq!(report.settled, 1);
    assert_eq!(report.bridge.started, 1);
    assert_eq!(report.bridge.completed(), 1);
}

#[tokio::test]
async fn test_start_function_call_sees_no_instance() {
    init_tracing();

    let wasm = wat::parse_str(include_str!("wasm/start_section_guest.wat")).unwrap();
    let runtime = Runtime::new(RuntimeConfig::default()).unwrap();
    let mut session = runtime
        .instantiate(&wasm, bridge_with(7, HostPromise::resolved(json!("early"))))
        .await
        .expect("start-section call must not fail instantiation");

    assert_eq!(session.stats().instance_absent, 1);
    assert_eq!(session.promise_bridge().pending(), 0);

    session.call("main").await.unwrap();
    assert_eq!(session.run_until_idle().await.unwrap(), 0);

    assert_eq!(session.read_u32(100).unwrap(), 0, "nothing stored");
    assert_eq!(session.read_u32(200).unwrap(), 0, "guest never signaled");
    assert_eq!(
        session.promise_bridge().state(PromiseId::new(7)),
        Some(PromiseState::Registered)
    );
}

#[tokio::test]
async fn test_guest_awaits_again_from_completion_callback() {
    init_tracing();

    let wasm = wat::parse_str(include_str!("wasm/chained_guest.wat")).unwrap();
    let mut bridge = bridge_with(1, HostPromise::resolved(json!("first")));
    bridge
        .insert_promise(PromiseId::new(2), HostPromise::resolved(json!("second")))
        .unwrap();

    let runtime = Runtime::new(RuntimeConfig::default()).unwrap();
    let mut session = runtime.instantiate(&wasm, bridge).await.unwrap();
    session.call("main").await.unwrap();

    assert_eq!(session.run_until_idle().await.unwrap(), 2);
    assert_eq!(session.read_u32(200).unwrap(), 2);
    assert_eq!(session.read_u32(204).unwrap(), 1);
    assert_eq!(session.read_u32(208).unwrap(), 2);

    let second = session.read_u32(104).unwrap();
    assert_eq!(session.value(ValueRef::new(second)), Some(&json!("second")));
}

#[tokio::test(start_paused = true)]
async fn test_teardown_cancels_awaiting_promise() {
    init_tracing();

    let slow = HostPromise::new(async {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(json!("late"))
    });

    let runtime = Runtime::new(RuntimeConfig::default()).unwrap();
    let mut session = runtime
        .instantiate(&awaiting_guest(), bridge_with(7, slow))
        .await
        .unwrap();
    session.call("main").await.unwrap();

    assert_eq!(session.teardown(), 1);
    assert_eq!(session.run_until_idle().await.unwrap(), 0);
    assert_eq!(
        session.promise_bridge().state(PromiseId::new(7)),
        Some(PromiseState::Cancelled)
    );
    assert!(session.call("main").await.is_err(), "torn-down guest is gone");
}

#[tokio::test]
async fn test_missing_completion_export() {
    init_tracing();

    let wat = r#"
        (module
            (import "collector-web" "startAwaiting" (func $start_awaiting (param i32 i32)))
            (memory (export "memory") 1)
            (func (export "main") (result i32)
                (call $start_awaiting (i32.const 7) (i32.const 100))
                (i32.const 0)
            )
        )
    "#;
    let wasm = wat::parse_str(wat).unwrap();

    let runtime = Runtime::new(RuntimeConfig::default()).unwrap();
    let mut session = runtime
        .instantiate(&wasm, bridge_with(7, HostPromise::resolved(json!("ok"))))
        .await
        .unwrap();
    session.call("main").await.unwrap();

    let err = session.run_until_idle().await.unwrap_err();
    assert!(err.is_missing_export());

    // The value was stored before the signal failed.
    assert_ne!(session.read_u32(100).unwrap(), 0);
    assert_eq!(
        session.promise_bridge().state(PromiseId::new(7)),
        Some(PromiseState::Failed)
    );
    assert_eq!(session.stats().fulfilled, 0);
}

#[tokio::test]
async fn test_unknown_promise_is_ignored() {
    init_tracing();

    let runtime = Runtime::new(RuntimeConfig::default()).unwrap();
    let report = runtime
        .execute(&awaiting_guest(), "main", PromiseBridge::new())
        .await
        .unwrap();

    assert_eq!(report.settled, 0);
    assert_eq!(report.bridge.unknown_promise, 1);
}

#[tokio::test(start_paused = true)]
async fn test_settle_timeout() {
    init_tracing();

    let never = HostPromise::new(std::future::pending::<Result<Value, Value>>());
    let config = RuntimeConfig::builder()
        .settle_timeout(Duration::from_millis(100))
        .build();
    let runtime = Runtime::new(config).unwrap();

    let err = runtime
        .execute(&awaiting_guest(), "main", bridge_with(7, never))
        .await
        .unwrap_err();
    assert!(err.is_timeout());
}

#[tokio::test]
async fn test_memory_limit_enforcement() {
    init_tracing();

    // 100 pages is 6.4MB, over a 1MB limit.
    let wat = r#"
        (module
            (memory (export "memory") 100)
            (func (export "main") (result i32)
                (i32.const 0)
            )
        )
    "#;
    let wasm = wat::parse_str(wat).unwrap();

    let config = RuntimeConfig::builder().memory_limit_mb(1).build();
    let runtime = Runtime::new(config).unwrap();

    let err = runtime
        .execute(&wasm, "main", PromiseBridge::new())
        .await
        .unwrap_err();
    assert!(err.is_wasm_error());
}

#[tokio::test]
async fn test_read_value_with_small_buffer() {
    init_tracing();

    let wat = r#"
        (module
            (import "collector-web" "readValue" (func $read_value (param i32 i32 i32) (result i32)))
            (import "collector-web" "valueLength" (func $value_length (param i32) (result i32)))
            (memory (export "memory") 1)
            (func (export "main") (result i32)
                (i32.add
                    (call $read_value (i32.const 99) (i32.const 0) (i32.const 16))
                    (call $value_length (i32.const 99)))
            )
        )
    "#;
    let wasm = wat::parse_str(wat).unwrap();

    let runtime = Runtime::new(RuntimeConfig::default()).unwrap();
    let report = runtime
        .execute(&wasm, "main", PromiseBridge::new())
        .await
        .unwrap();

    // Both imports report -1 for an unknown handle.
    assert_eq!(report.exit_code, -2);
}

#[tokio::test]
async fn test_entry_timeout_interrupts_looping_guest() {
    init_tracing();

    let wat = r#"
        (module
            (func (export "main") (result i32)
                (loop $spin (br $spin))
                (i32.const 0)
            )
        )
    "#;
    let wasm = wat::parse_str(wat).unwrap();

    let config = RuntimeConfig::builder()
        .entry_timeout(Duration::from_millis(200))
        .build();
    let runtime = Runtime::new(config).unwrap();

    let outcome = tokio::time::timeout(
        Duration::from_secs(10),
        runtime.execute(&wasm, "main", PromiseBridge::new()),
    )
    .await
    .expect("looping guest was not interrupted");

    let err = outcome.unwrap_err();
    assert!(err.is_timeout(), "unexpected error: {err}");
}

#[tokio::test]
async fn test_settle_timeout_interrupts_looping_callback() {
    init_tracing();

    let wat = r#"
        (module
            (import "collector-web" "startAwaiting" (func $start_awaiting (param i32 i32)))
            (memory (export "memory") 1)
            (func (export "main") (result i32)
                (call $start_awaiting (i32.const 7) (i32.const 100))
                (i32.const 0)
            )
            (func (export "onPromiseCompleted") (param i32 i32)
                (loop $spin (br $spin))
            )
        )
    "#;
    let wasm = wat::parse_str(wat).unwrap();

    let config = RuntimeConfig::builder()
        .settle_timeout(Duration::from_millis(200))
        .build();
    let runtime = Runtime::new(config).unwrap();

    let outcome = tokio::time::timeout(
        Duration::from_secs(10),
        runtime.execute(&wasm, "main", bridge_with(7, HostPromise::resolved(json!(1)))),
    )
    .await
    .expect("looping callback was not interrupted");

    assert!(outcome.unwrap_err().is_timeout());
}
