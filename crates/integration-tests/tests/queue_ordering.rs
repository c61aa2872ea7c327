//! Ordering and concurrency of the per-identity command queue
//!
//! Commands for one identity run one at a time in submission order, even
//! when some of them need retries. Different identities run side by side.

use ambrogio_core::application::CommandQueue;
use ambrogio_core::domain::{Command, Operation};
use ambrogio_core::port::remote_client::mocks::{Reply, ScriptedClient};
use ambrogio_core::port::RemoteError;
use ambrogio_core::QueueConfig;
use futures::future::join_all;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn echo(identity: &str, seq: usize) -> Command {
    Command::new(
        identity,
        Operation::Raw {
            command: "test.echo".into(),
            params: json!({ "seq": seq }),
        },
    )
    .with_label(format!("echo-{}", seq))
}

fn seq_of(params: &Value) -> u64 {
    params["seq"].as_u64().expect("seq param")
}

/// Per-identity FIFO holds while some commands fail and are retried
#[tokio::test]
async fn test_fifo_under_retries() {
    let transport = || Reply::Fail(RemoteError::Transport("HTTP 502: bad gateway".into()));
    let client = Arc::new(ScriptedClient::with_script([
        transport(),
        Reply::Echo,
        Reply::Echo,
        transport(),
        transport(),
        Reply::Echo,
    ]));
    let queue = CommandQueue::new(client.clone(), None, QueueConfig::default());

    let submissions = (0..5).map(|i| queue.execute(echo("3561", i)));
    let results = join_all(submissions).await;

    for (i, result) in results.into_iter().enumerate() {
        let value = result.unwrap_or_else(|e| panic!("command {} failed: {}", i, e));
        assert_eq!(value["params"]["seq"], i);
    }

    let order: Vec<u64> = client.calls().iter().map(|c| seq_of(&c.params)).collect();
    assert_eq!(order, vec![0, 0, 1, 2, 2, 2, 3, 4]);

    queue.stop().await;
}

/// Fire-and-forget commands keep their place in line
#[tokio::test]
async fn test_enqueued_commands_run_before_later_waits() {
    let client = Arc::new(ScriptedClient::new());
    let queue = CommandQueue::new(client.clone(), None, QueueConfig::default());

    for i in 0..10 {
        queue.enqueue(echo("3561", i)).await.unwrap();
    }
    let last = queue.execute(echo("3561", 10)).await.unwrap();
    assert_eq!(last["params"]["seq"], 10);

    let order: Vec<u64> = client.calls().iter().map(|c| seq_of(&c.params)).collect();
    assert_eq!(order, (0..=10).collect::<Vec<u64>>());

    queue.stop().await;
}

/// At most one command in flight per identity
#[tokio::test]
async fn test_same_identity_is_serialized() {
    let client = Arc::new(ScriptedClient::always(Reply::Sleep(Duration::from_millis(100))));
    let queue = CommandQueue::new(client.clone(), None, QueueConfig::default());

    let started = Instant::now();
    let results = join_all((0..3).map(|i| queue.execute(echo("3561", i)))).await;
    let elapsed = started.elapsed();

    assert!(results.iter().all(Result::is_ok));
    assert!(elapsed >= Duration::from_millis(300), "elapsed {:?}", elapsed);

    let calls = client.calls();
    for pair in calls.windows(2) {
        assert!(pair[1].started_at.duration_since(pair[0].started_at) >= Duration::from_millis(100));
    }

    queue.stop().await;
}

/// Different identities progress concurrently: total time is about the max, not the sum
#[tokio::test]
async fn test_identities_run_concurrently() {
    let client = Arc::new(ScriptedClient::always(Reply::Sleep(Duration::from_millis(200))));
    let queue = CommandQueue::new(client.clone(), None, QueueConfig::default());

    let identities = ["111", "222", "333", "444"];
    let started = Instant::now();
    let results = join_all(identities.iter().map(|id| queue.execute(echo(id, 0)))).await;
    let elapsed = started.elapsed();

    assert!(results.iter().all(Result::is_ok));
    assert!(elapsed >= Duration::from_millis(200), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(600), "elapsed {:?}", elapsed);
    assert_eq!(client.call_count(), 4);
    assert_eq!(queue.active_identities(), vec!["111", "222", "333", "444"]);

    queue.stop().await;
}

/// Results are routed back to the right caller across identities
#[tokio::test]
async fn test_results_match_their_commands() {
    let client = Arc::new(ScriptedClient::new());
    let queue = CommandQueue::new(client, None, QueueConfig::default());

    let commands: Vec<Command> = (0..6)
        .map(|i| echo(if i % 2 == 0 { "even" } else { "odd" }, i))
        .collect();
    let results = join_all(commands.into_iter().map(|c| queue.execute(c))).await;

    for (i, result) in results.into_iter().enumerate() {
        assert_eq!(result.unwrap()["params"]["seq"], i);
    }

    queue.stop().await;
}
