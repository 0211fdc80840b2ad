//! Periodic device enumeration
//!
//! [`DevicePoller`] sends [`Message::RefreshDevices`] immediately and then on
//! every interval tick. Dropping it stops the task, so the engine controls
//! polling by holding or releasing the handle.

use std::time::Duration;

use stickwriter_core::prelude::*;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::message::Message;

/// Time between enumerations
pub const POLL_INTERVAL: Duration = Duration::from_secs(8);

/// Handle to the polling task. Aborts the task on drop.
#[derive(Debug)]
pub struct DevicePoller {
    handle: JoinHandle<()>,
}

impl DevicePoller {
    /// Start polling with [`POLL_INTERVAL`]
    pub fn spawn(msg_tx: mpsc::Sender<Message>, shutdown_rx: watch::Receiver<bool>) -> Self {
        Self::with_interval(msg_tx, shutdown_rx, POLL_INTERVAL)
    }

    pub fn with_interval(
        msg_tx: mpsc::Sender<Message>,
        mut shutdown_rx: watch::Receiver<bool>,
        period: Duration,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            debug!("Device polling started ({:?})", period);
            loop {
                tokio::select! {
                    // First tick completes immediately
                    _ = interval.tick() => {
                        if msg_tx.send(Message::RefreshDevices).await.is_err() {
                            debug!("Engine gone, stopping device polling");
                            break;
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        Self { handle }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for DevicePoller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
