//! Background listener that mirrors job events into the tracing log.

use tokio::sync::broadcast;

use crate::bus::JobEvent;

/// Log every event until the bus is dropped.
///
/// Intended to be spawned once at startup:
/// `tokio::spawn(log_events(bus.subscribe()))`.
pub async fn log_events(mut rx: broadcast::Receiver<JobEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                if event.status.is_terminal() {
                    tracing::info!(
                        job_id = %event.job_id,
                        status = %event.status,
                        message = %event.message,
                        output_file = ?event.output_file,
                        "Job finished",
                    );
                } else {
                    tracing::debug!(
                        job_id = %event.job_id,
                        status = %event.status,
                        message = %event.message,
                        "Job progress",
                    );
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event log listener lagged, events dropped");
            }
            Err(broadcast::error::RecvError::Closed) => {
                tracing::debug!("Event bus closed, log listener exiting");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::bus::EventBus;

    use super::*;

    #[tokio::test]
    async fn listener_exits_when_bus_is_dropped() {
        let bus = EventBus::default();
        let handle = tokio::spawn(log_events(bus.subscribe()));

        drop(bus);

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("listener should stop once the bus closes")
            .unwrap();
    }
}
