use crate::config::DeliveryConfig;
use crate::error::CameraError;
use crate::frame::FrameData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

/// Per-frame extension point.
///
/// Runs on the delivery queue, never on the UI context. Implementations must
/// return promptly and must not hold on to the frame after returning.
pub trait FrameHandler: Send + Sync {
    fn on_frame(&self, frame: &FrameData);
}

/// Default handler, does nothing with the frame
pub struct NoopFrameHandler;

impl FrameHandler for NoopFrameHandler {
    fn on_frame(&self, _frame: &FrameData) {}
}

/// Counts frames as they arrive
#[derive(Default)]
pub struct FrameCounter {
    frames: AtomicU64,
    last_id: AtomicU64,
}

impl FrameCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// Id of the most recent frame, if any arrived
    pub fn last_id(&self) -> Option<u64> {
        if self.frames() == 0 {
            None
        } else {
            Some(self.last_id.load(Ordering::Relaxed))
        }
    }
}

impl FrameHandler for FrameCounter {
    fn on_frame(&self, frame: &FrameData) {
        self.last_id.store(frame.id, Ordering::Relaxed);
        self.frames.fetch_add(1, Ordering::Relaxed);
    }
}

/// Producer side of the delivery queue, handed to the backend as the frame output
#[derive(Clone)]
pub struct FrameSink {
    label: Arc<str>,
    sender: mpsc::Sender<FrameData>,
    discard_late_frames: bool,
    dropped: Arc<AtomicU64>,
}

impl FrameSink {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn discards_late_frames(&self) -> bool {
        self.discard_late_frames
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Hand a frame to the queue without blocking.
    ///
    /// Returns Ok(false) when the queue is full and the frame was dropped.
    pub fn deliver(&self, frame: FrameData) -> Result<bool, CameraError> {
        match self.sender.try_send(frame) {
            Ok(()) => Ok(true),
            Err(TrySendError::Full(frame)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                trace!("Queue '{}' full, dropped frame {}", self.label, frame.id);
                Ok(false)
            }
            Err(TrySendError::Closed(_)) => Err(CameraError::DeliveryClosed),
        }
    }

    /// Hand a frame to the queue, waiting for room if needed
    pub async fn deliver_async(&self, frame: FrameData) -> Result<(), CameraError> {
        self.sender
            .send(frame)
            .await
            .map_err(|_| CameraError::DeliveryClosed)
    }
}

/// Dedicated serial queue that runs the frame handler off the UI context
pub struct DeliveryQueue {
    sink: FrameSink,
    delivered: Arc<AtomicU64>,
    task: JoinHandle<()>,
}

impl DeliveryQueue {
    /// Spawn the queue on the current tokio runtime
    pub fn spawn(config: &DeliveryConfig, handler: Arc<dyn FrameHandler>) -> Self {
        let (sender, mut receiver) = mpsc::channel::<FrameData>(config.capacity.max(1));
        let label: Arc<str> = Arc::from(config.queue_label.as_str());
        let delivered = Arc::new(AtomicU64::new(0));

        let task_label = Arc::clone(&label);
        let task_delivered = Arc::clone(&delivered);
        let task = tokio::spawn(async move {
            debug!("Delivery queue '{}' started", task_label);

            // One frame in flight: the next recv happens only after the handler returns.
            while let Some(frame) = receiver.recv().await {
                handler.on_frame(&frame);
                task_delivered.fetch_add(1, Ordering::Relaxed);
            }

            debug!("Delivery queue '{}' drained", task_label);
        });

        info!(
            "Frame delivery queue '{}' created (capacity {}, discard late frames: {})",
            label, config.capacity, config.discard_late_frames
        );

        Self {
            sink: FrameSink {
                label,
                sender,
                discard_late_frames: config.discard_late_frames,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            delivered,
            task,
        }
    }

    pub fn sink(&self) -> FrameSink {
        self.sink.clone()
    }

    pub fn label(&self) -> &str {
        self.sink.label()
    }

    /// Frames the handler has finished with
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.sink.dropped()
    }

    /// Stop the queue; frames still buffered are discarded
    pub fn close(self) {
        self.task.abort();
        debug!("Delivery queue '{}' closed", self.sink.label);
    }
}
