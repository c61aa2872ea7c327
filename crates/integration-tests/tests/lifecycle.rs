//! Queue lifecycle: waiting, timeouts, delays, pacing, panics and shutdown

use ambrogio_core::application::CommandQueue;
use ambrogio_core::domain::{Command, MethodCall, Operation};
use ambrogio_core::port::remote_client::mocks::{Reply, ScriptedClient};
use ambrogio_core::{CommandError, QueueConfig};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn work_now(identity: &str) -> Command {
    Command::new(identity, Operation::MethodExec(MethodCall::new("work_now")))
}

fn queue_with(client: &Arc<ScriptedClient>, config: QueueConfig) -> Arc<CommandQueue> {
    Arc::new(CommandQueue::new(client.clone(), None, config))
}

/// A hanging call times the caller out, and stop() still completes
#[tokio::test]
async fn test_timeout_on_hanging_call_then_stop_completes() {
    let client = Arc::new(ScriptedClient::always(Reply::Hang));
    let queue = queue_with(
        &client,
        QueueConfig::default().with_drain_timeout(Duration::from_millis(200)),
    );

    let timeout = Duration::from_millis(100);
    let result = queue.submit(work_now("3561"), true, Some(timeout)).await;
    assert_eq!(result, Err(CommandError::Timeout(timeout)));

    let started = Instant::now();
    queue.stop().await;
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(queue.is_stopped());
}

/// Callers still waiting when their worker is cancelled are told the queue stopped
#[tokio::test]
async fn test_cancelled_worker_releases_waiting_caller() {
    let client = Arc::new(ScriptedClient::always(Reply::Hang));
    let queue = queue_with(
        &client,
        QueueConfig::default().with_drain_timeout(Duration::from_millis(100)),
    );

    let waiter = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move {
            queue
                .submit(work_now("3561"), true, Some(Duration::from_secs(10)))
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    queue.stop().await;
    assert_eq!(waiter.await.unwrap(), Err(CommandError::QueueStopped));
}

/// stop() lets every queued command run before the workers exit
#[tokio::test]
async fn test_stop_drains_queued_commands() {
    let client = Arc::new(ScriptedClient::always(Reply::Sleep(Duration::from_millis(20))));
    let queue = queue_with(&client, QueueConfig::default());

    for _ in 0..5 {
        queue.enqueue(work_now("3561")).await.unwrap();
    }
    queue.enqueue(work_now("4242")).await.unwrap();

    queue.stop().await;

    assert_eq!(client.call_count(), 6);
    assert!(queue.active_identities().is_empty());
}

/// Without a drain bound, stop() waits out long work instead of dropping
/// what is queued behind it
#[tokio::test(start_paused = true)]
async fn test_stop_runs_commands_queued_behind_a_long_delay() {
    let client = Arc::new(ScriptedClient::new());
    let queue = queue_with(&client, QueueConfig::default());

    queue
        .enqueue(Command::delay("3561", Duration::from_secs(60)))
        .await
        .unwrap();
    queue.enqueue(work_now("3561")).await.unwrap();

    queue.stop().await;

    assert_eq!(client.call_count(), 1);
    assert_eq!(client.calls()[0].command, "method.exec");
}

#[tokio::test]
async fn test_submit_after_stop_is_rejected() {
    let client = Arc::new(ScriptedClient::new());
    let queue = queue_with(&client, QueueConfig::default());
    queue.execute(work_now("3561")).await.unwrap();

    queue.stop().await;

    assert_eq!(
        queue.execute(work_now("3561")).await,
        Err(CommandError::QueueStopped)
    );
    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn test_second_stop_is_a_no_op() {
    let client = Arc::new(ScriptedClient::new());
    let queue = queue_with(&client, QueueConfig::default());
    queue.execute(work_now("3561")).await.unwrap();

    queue.stop().await;
    let started = Instant::now();
    queue.stop().await;

    assert!(started.elapsed() < Duration::from_millis(50));
}

/// A 0.2s delay resolves no earlier than 0.2s, with a null result
#[tokio::test]
async fn test_delay_command() {
    let client = Arc::new(ScriptedClient::new());
    let queue = queue_with(&client, QueueConfig::default());

    let started = Instant::now();
    let result = queue
        .execute(Command::delay("3561", Duration::from_millis(200)))
        .await;

    assert_eq!(result, Ok(Value::Null));
    assert!(started.elapsed() >= Duration::from_millis(200));
    assert_eq!(client.call_count(), 0);

    queue.stop().await;
}

/// A delay holds back later commands of the same identity only
#[tokio::test]
async fn test_delay_only_blocks_its_identity() {
    let client = Arc::new(ScriptedClient::new());
    let queue = queue_with(&client, QueueConfig::default());

    queue
        .enqueue(Command::delay("3561", Duration::from_millis(300)))
        .await
        .unwrap();

    let started = Instant::now();
    queue.execute(work_now("4242")).await.unwrap();
    assert!(started.elapsed() < Duration::from_millis(200));

    queue.execute(work_now("3561")).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(250));

    queue.stop().await;
}

#[tokio::test]
async fn test_fire_and_forget_returns_immediately_and_runs() {
    let client = Arc::new(ScriptedClient::always(Reply::Sleep(Duration::from_millis(200))));
    let queue = queue_with(&client, QueueConfig::default());

    let started = Instant::now();
    let result = queue.submit(work_now("3561"), false, None).await;
    assert_eq!(result, Ok(Value::Null));
    assert!(started.elapsed() < Duration::from_millis(100));

    queue.execute(work_now("3561")).await.unwrap();
    assert_eq!(client.call_count(), 2);

    queue.stop().await;
}

/// The command's own timeout wins over the caller's
#[tokio::test]
async fn test_command_timeout_overrides_caller_timeout() {
    let client = Arc::new(ScriptedClient::always(Reply::Sleep(Duration::from_millis(300))));
    let queue = queue_with(&client, QueueConfig::default());

    let command = work_now("3561").with_timeout(Duration::from_millis(50));
    let result = queue
        .submit(command, true, Some(Duration::from_secs(5)))
        .await;
    assert_eq!(result, Err(CommandError::Timeout(Duration::from_millis(50))));

    // The timed-out command still runs to completion
    queue.stop().await;
    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn test_pacing_spaces_out_commands() {
    let client = Arc::new(ScriptedClient::new());
    let queue = queue_with(
        &client,
        QueueConfig::default().with_pacing(Duration::from_millis(100)),
    );

    queue.execute(work_now("3561")).await.unwrap();
    queue.execute(work_now("3561")).await.unwrap();

    let calls = client.calls();
    let gap = calls[1].started_at.duration_since(calls[0].started_at);
    assert!(gap >= Duration::from_millis(100), "gap {:?}", gap);

    queue.stop().await;
}

/// A panic while executing becomes an error for that caller; the worker lives on
#[tokio::test]
async fn test_panic_is_isolated() {
    let client = Arc::new(ScriptedClient::with_script([Reply::Panic(
        "driver exploded".into(),
    )]));
    let queue = queue_with(&client, QueueConfig::default());

    let first = queue.execute(work_now("3561")).await;
    assert_eq!(
        first,
        Err(CommandError::Unexpected("driver exploded".into()))
    );

    let second = queue.execute(work_now("3561")).await;
    assert!(second.is_ok());
    assert_eq!(queue.active_identities(), vec!["3561"]);

    queue.stop().await;
}

#[tokio::test]
async fn test_stop_operation_cannot_be_submitted() {
    let client = Arc::new(ScriptedClient::new());
    let queue = queue_with(&client, QueueConfig::default());

    let result = queue.execute(Command::new("3561", Operation::Stop)).await;

    assert!(matches!(result, Err(CommandError::ReservedOperation(_))));
    assert!(!queue.is_stopped());
    assert!(queue.active_identities().is_empty());
}
