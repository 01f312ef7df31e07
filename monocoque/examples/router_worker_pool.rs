/// ROUTER Worker Pool Example
///
/// This example demonstrates a single ROUTER socket acting as a load
/// balancer distributing work across multiple DEALER workers, all routed
/// through one shared routing table instead of a separate socket per
/// connection.
///
/// Architecture:
/// - ROUTER server listens on port 5555 and accepts any number of peers
/// - Multiple DEALER clients connect and request work
/// - ROUTER distributes tasks round-robin across whichever workers are
///   currently connected, addressing each by its identity
use bytes::Bytes;
use monocoque::zmq::RouterSocket;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{error, info};

#[compio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting ROUTER worker pool on tcp://127.0.0.1:5555");

    let mut router = RouterSocket::listen("127.0.0.1:5555").await?;
    let task_counter = AtomicU64::new(0);

    info!("Waiting for worker connections...");

    // Accept a small fixed pool of workers into the same router, then
    // dispatch tasks to whichever identity answers next.
    let mut workers = Vec::new();
    for _ in 0..3 {
        let identity = router.accept().await?;
        info!("Worker connected with identity {:?}", identity);
        workers.push(identity);
    }

    for round in 0..10 {
        let worker = &workers[round % workers.len()];
        let task_id = task_counter.fetch_add(1, Ordering::SeqCst);
        let task = format!("Task #{task_id}");

        info!("Sending to {:?}: {task}", worker);
        if let Err(e) = router.send(vec![worker.clone(), Bytes::from(task)]).await {
            error!("Send error: {e}");
            break;
        }

        match router.recv().await {
            Some(response) => {
                if let Some(result) = response.last() {
                    if let Ok(s) = std::str::from_utf8(result) {
                        info!("Worker {:?} completed: {s}", response[0]);
                    }
                }
            }
            None => {
                error!("Connection closed");
                break;
            }
        }

        compio::time::sleep(std::time::Duration::from_millis(100)).await;
    }

    info!("Worker pool session complete");
    Ok(())
}
