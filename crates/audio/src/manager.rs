//! Capture queue between transport and pipeline

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use voice_bridge_core::{AudioFrame, AudioStream};

use crate::resample::{decimate, decimation_stride};
use crate::AudioError;

/// Buffers inbound chunks, normalizes them to the pipeline rate, and
/// exposes them as a terminable lazy sequence.
///
/// One manager per capture. `push_chunk` accepts chunks in arrival order;
/// `create_stream` may be called once; `end` closes the sequence so the
/// consumer observes completion after draining what is buffered.
pub struct AudioStreamManager {
    tx: Mutex<Option<mpsc::Sender<AudioFrame>>>,
    rx: Mutex<Option<mpsc::Receiver<AudioFrame>>>,
    target_rate: u32,
}

impl AudioStreamManager {
    /// Create a manager producing frames at `target_rate`, buffering at
    /// most `capacity` frames before `push_chunk` applies backpressure.
    pub fn new(target_rate: u32, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            tx: Mutex::new(Some(tx)),
            rx: Mutex::new(Some(rx)),
            target_rate,
        }
    }

    /// Target sample rate of the produced frames
    pub fn target_rate(&self) -> u32 {
        self.target_rate
    }

    /// Accept one chunk at the declared inbound rate.
    ///
    /// The chunk is decimated to the target rate before it is enqueued.
    /// Returns an error after `end`, and when the consumer dropped the
    /// stream mid-capture.
    pub async fn push_chunk(&self, samples: &[i16], sample_rate: u32) -> Result<(), AudioError> {
        let tx = self.tx.lock().clone().ok_or(AudioError::Ended)?;

        let stride = decimation_stride(sample_rate, self.target_rate);
        let frame = AudioFrame::new(decimate(samples, stride), self.target_rate);
        if frame.is_empty() {
            return Ok(());
        }

        tx.send(frame).await.map_err(|_| AudioError::ConsumerGone)
    }

    /// Take the single-consumer frame sequence
    pub fn create_stream(&self) -> Result<AudioStream, AudioError> {
        let rx = self.rx.lock().take().ok_or(AudioError::StreamTaken)?;
        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    /// Signal that no further chunks will arrive. Idempotent.
    pub fn end(&self) {
        self.tx.lock().take();
    }

    /// Whether `end` has been called
    pub fn is_ended(&self) -> bool {
        self.tx.lock().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_push_then_drain() {
        let manager = AudioStreamManager::new(16000, 8);
        let mut stream = manager.create_stream().unwrap();

        let chunk: Vec<i16> = (0..480).collect();
        manager.push_chunk(&chunk, 48000).await.unwrap();
        manager.end();

        let frame = stream.next().await.unwrap();
        assert_eq!(frame.sample_rate, 16000);
        assert_eq!(frame.len(), 160); // ceil(480 / 3)

        // End observed after the buffered frame drains
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_passthrough_at_target_rate() {
        let manager = AudioStreamManager::new(16000, 8);
        let mut stream = manager.create_stream().unwrap();

        manager.push_chunk(&[1, 2, 3, 4], 16000).await.unwrap();
        manager.end();

        let frame = stream.next().await.unwrap();
        assert_eq!(frame.samples, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_push_after_end_fails() {
        let manager = AudioStreamManager::new(16000, 8);
        manager.end();
        assert!(manager.is_ended());

        let result = manager.push_chunk(&[0; 16], 16000).await;
        assert!(matches!(result, Err(AudioError::Ended)));
    }

    #[tokio::test]
    async fn test_stream_is_single_consumer() {
        let manager = AudioStreamManager::new(16000, 8);
        let _stream = manager.create_stream().unwrap();
        assert!(matches!(
            manager.create_stream(),
            Err(AudioError::StreamTaken)
        ));
    }

    #[tokio::test]
    async fn test_empty_decimated_chunk_is_skipped() {
        let manager = AudioStreamManager::new(16000, 8);
        let mut stream = manager.create_stream().unwrap();

        manager.push_chunk(&[], 48000).await.unwrap();
        manager.push_chunk(&[7, 8, 9], 16000).await.unwrap();
        manager.end();

        let frame = stream.next().await.unwrap();
        assert_eq!(frame.samples, vec![7, 8, 9]);
        assert!(stream.next().await.is_none());
    }
}
