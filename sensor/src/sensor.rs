use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::Sensation;

/// Trait implemented by anything that streams [`Sensation`]s.
#[async_trait]
pub trait Sensor: Send {
    /// Start streaming sensations to the provided channel.
    ///
    /// Returns once the receiving side has been dropped.
    async fn run(&mut self, tx: mpsc::Sender<Sensation>);
}
