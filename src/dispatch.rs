//! The UI-owning execution context.
//!
//! The controller is owned by a single [`UiLoop`]; everything that mutates it
//! arrives as a job through a [`UiContext`] handle. Callbacks that resolve on
//! other threads (the access prompt, for instance) hop back here before they
//! touch session state, so the session needs no further locking.

use crate::camera::CameraSessionController;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Work that must run on the UI context
pub type UiJob = Box<dyn FnOnce(&mut CameraSessionController) + Send + 'static>;

/// Cloneable handle used to post work onto the UI context
#[derive(Clone)]
pub struct UiContext {
    sender: mpsc::UnboundedSender<UiJob>,
}

/// Executor side of the UI context
pub struct UiLoop {
    receiver: mpsc::UnboundedReceiver<UiJob>,
}

impl UiContext {
    pub fn new() -> (UiContext, UiLoop) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (UiContext { sender }, UiLoop { receiver })
    }

    /// Queue a job. Returns false when the loop has gone away.
    pub fn dispatch<F>(&self, job: F) -> bool
    where
        F: FnOnce(&mut CameraSessionController) + Send + 'static,
    {
        match self.sender.send(Box::new(job)) {
            Ok(()) => true,
            Err(_) => {
                debug!("UI context closed, dropping job");
                false
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl UiLoop {
    /// Wait for one job and run it. Returns false once every handle is dropped,
    /// which cannot happen while a controller built on this context is alive.
    pub async fn turn(&mut self, controller: &mut CameraSessionController) -> bool {
        match self.receiver.recv().await {
            Some(job) => {
                job(controller);
                true
            }
            None => false,
        }
    }

    /// Run every job already queued without waiting. Returns how many ran.
    pub fn drain(&mut self, controller: &mut CameraSessionController) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.receiver.try_recv() {
            job(controller);
            ran += 1;
        }
        ran
    }

    /// Run jobs until cancelled, then hand the controller back.
    pub async fn run(
        mut self,
        mut controller: CameraSessionController,
        cancel: CancellationToken,
    ) -> CameraSessionController {
        info!("UI context running");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("UI context cancelled");
                    break;
                }
                _ = self.turn(&mut controller) => {}
            }
        }

        // Jobs posted before cancellation still belong to this context.
        self.drain(&mut controller);
        info!("UI context stopped");
        controller
    }
}
