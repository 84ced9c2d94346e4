//! Event loop and teardown

use std::future::Future;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::Dispatcher;
use crate::device::DeviceEvent;
use crate::midi::format_hex;

impl super::Controller {
    /// Consume device events until the stream ends or `shutdown` resolves,
    /// then tear down
    pub async fn run(
        &mut self,
        mut events: mpsc::Receiver<DeviceEvent>,
        shutdown: impl Future<Output = ()>,
    ) {
        info!("Ready to process pad events!");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                maybe_event = events.recv() => match maybe_event {
                    Some(event) => {
                        debug!(
                            "Received pad event: {} (queued {:?})",
                            format_hex(&event.raw_data),
                            event.timestamp.elapsed()
                        );
                        self.handle_raw(&event.raw_data).await;
                    }
                    None => {
                        warn!("Device event stream closed, stopping event loop");
                        break;
                    }
                },

                _ = &mut shutdown => {
                    info!("Shutdown signal received, stopping event loop");
                    break;
                }
            }
        }

        self.shutdown().await;
    }

    /// Turn the LEDs off, close the device, then wait for queued actions
    pub async fn shutdown(&mut self) {
        info!("Shutting down...");

        if self.device.is_connected() {
            self.feedback.reset_all(self.grid_size);
        } else {
            debug!("Device already closed, skipping LED reset");
        }
        self.device.disconnect();

        if let Dispatcher::Queued(queue) = &mut self.dispatcher {
            queue.shutdown().await;
        }

        info!("👋 Controller stopped");
    }
}
