//! Periodic diagnostic tick task.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::event::Event;

/// Cadence of the diagnostic dump trigger.
pub const DIAG_INTERVAL: Duration = Duration::from_millis(20_000);

/// Spawns the tick task: one `DiagnosticTick` per interval until the token
/// is cancelled or the queue closes.
///
/// A single task owns the schedule, so at most one tick is ever pending
/// and cancellation is honored at every interval boundary.
pub fn spawn(
    events: mpsc::UnboundedSender<Event>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {
                    if events.send(Event::DiagnosticTick).is_err() {
                        break;
                    }
                }
            }
        }
        log::debug!("router: diagnostic timer stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn ticks_arrive_on_the_fixed_cadence() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let handle = spawn(tx, DIAG_INTERVAL, cancel.clone());

        let start = tokio::time::Instant::now();
        assert_eq!(rx.recv().await, Some(Event::DiagnosticTick));
        assert_eq!(start.elapsed(), DIAG_INTERVAL);
        // Exactly one tick in flight at a time.
        assert!(rx.try_recv().is_err());
        assert_eq!(rx.recv().await, Some(Event::DiagnosticTick));
        assert_eq!(start.elapsed(), DIAG_INTERVAL * 2);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_the_task() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let handle = spawn(tx, DIAG_INTERVAL, cancel.clone());

        assert_eq!(rx.recv().await, Some(Event::DiagnosticTick));
        cancel.cancel();
        handle.await.unwrap();
        tokio::time::advance(DIAG_INTERVAL * 3).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn closed_queue_stops_the_task() {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let handle = spawn(tx, DIAG_INTERVAL, cancel);
        drop(rx);
        handle.await.unwrap();
    }
}
