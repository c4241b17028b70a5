//! Runtime - event loop and graceful shutdown

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::core::ServiceEvent;
use crate::service::AdzanService;

pub type EventSender = mpsc::UnboundedSender<ServiceEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<ServiceEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Shutdown latch. Once triggered it stays triggered.
#[derive(Clone)]
pub struct Shutdown {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for Shutdown {
    fn default() -> Self { Self::new() }
}

impl Shutdown {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self { sender: Arc::new(sender) }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }

    pub fn trigger(&self) {
        self.sender.send_if_modified(|triggered| !std::mem::replace(triggered, true));
    }

    pub fn is_triggered(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolve once triggered (immediately if it already was).
    pub async fn wait(&self) {
        let mut rx = self.subscribe();
        let _ = rx.wait_for(|triggered| *triggered).await;
    }
}

/// Drain host events into the service until shutdown or the senders close.
/// On shutdown the timer is stopped so no alert fires into a dying process.
pub fn spawn_event_loop(service: Arc<AdzanService>, mut events: EventReceiver, shutdown: Shutdown) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.wait() => {
                    service.stop_timer();
                    tracing::info!("Event loop stopped");
                    break;
                }
                event = events.recv() => match event {
                    Some(event) => {
                        tracing::debug!(?event, "Service event");
                        service.handle(event);
                    }
                    None => break,
                },
            }
        }
    })
}

/// Install signal handlers and return shutdown handle
pub fn install_signal_handlers() -> Shutdown {
    let shutdown = Shutdown::new();
    let handle = shutdown.clone();

    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm = signal(SignalKind::terminate()).expect("SIGTERM handler");
            let mut sigint = signal(SignalKind::interrupt()).expect("SIGINT handler");

            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM"),
                _ = sigint.recv() => tracing::info!("Received SIGINT"),
            }
        }

        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c().await.expect("Ctrl+C handler");
            tracing::info!("Received Ctrl+C");
        }

        handle.trigger();
    });

    shutdown
}
