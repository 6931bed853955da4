use crate::sensor::{OrientationReading, ScreenRotation};
use tokio::sync::mpsc::{self, error::TryRecvError, Receiver};
use tokio::task::JoinHandle;

/// Channel depth between a source's delivery task and its subscriber
pub const SUBSCRIPTION_CAPACITY: usize = 256;

/// Platform orientation sensor, as seen by the game.
#[allow(async_fn_in_trait)]
pub trait OrientationSource {
    /// Start delivering readings. Dropping the subscription unsubscribes.
    fn subscribe(&mut self) -> Subscription;

    /// Rotation the screen is currently in
    fn screen_rotation(&self) -> ScreenRotation;

    /// One-shot permission negotiation. Platforms without a permission gate
    /// resolve to `true` immediately.
    async fn request_permission(&mut self) -> bool;
}

/// Live orientation stream handed out by [`OrientationSource::subscribe`].
///
/// Owns the delivery task, which is aborted when the subscription drops.
pub struct Subscription {
    rx: Receiver<OrientationReading>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Subscription fed by a spawned delivery task
    pub fn with_task(rx: Receiver<OrientationReading>, task: JoinHandle<()>) -> Self {
        Subscription {
            rx,
            task: Some(task),
        }
    }

    /// Subscription fed by a sender the caller keeps
    pub fn channel(capacity: usize) -> (mpsc::Sender<OrientationReading>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Subscription { rx, task: None })
    }

    /// Next reading, or `None` once the source has finished
    pub async fn next(&mut self) -> Option<OrientationReading> {
        self.rx.recv().await
    }

    /// Non-blocking poll used by frame-driven loops
    pub fn try_next(&mut self) -> Option<OrientationReading> {
        match self.rx.try_recv() {
            Ok(reading) => Some(reading),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Stop delivery now instead of waiting for drop
    pub fn unsubscribe(&mut self) {
        self.rx.close();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::OrientationSample;

    #[tokio::test]
    async fn test_channel_subscription_delivers_in_order() {
        let (tx, mut sub) = Subscription::channel(8);
        for t in 0..3u64 {
            tx.send(OrientationReading::new(
                t * 16,
                ScreenRotation::LandscapePrimary,
                OrientationSample::from_gamma(t as f64),
            ))
            .await
            .unwrap();
        }
        drop(tx);

        let mut seen = Vec::new();
        while let Some(reading) = sub.next().await {
            seen.push(reading.t_ms);
        }
        assert_eq!(seen, vec![0, 16, 32]);
    }

    #[tokio::test]
    async fn test_unsubscribe_closes_sender_side() {
        let (tx, mut sub) = Subscription::channel(8);
        sub.unsubscribe();
        let reading = OrientationReading::new(0, ScreenRotation::Portrait, OrientationSample::default());
        assert!(tx.send(reading).await.is_err());
        assert!(sub.try_next().is_none());
    }
}
