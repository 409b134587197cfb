//! X11 Async Readiness
//!
//! Wakes the async main loop when the X11 socket becomes readable. A mio
//! poller runs on a blocking thread and signals a tokio `Notify`; the events
//! themselves are read by `X11Display::poll_event`.

use std::os::unix::io::AsRawFd;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{oneshot, Notify};
use x11rb::rust_connection::RustConnection;

const X11_TOKEN: mio::Token = mio::Token(0);

/// Readiness source for the X11 connection
pub struct X11EventStream {
    notify: Arc<Notify>,
    /// Dropping this stops the poller thread
    _task_guard: oneshot::Receiver<()>,
}

impl X11EventStream {
    /// Register the connection's socket with mio and start the poller.
    pub fn new(conn: Arc<RustConnection>) -> Result<Self> {
        let fd = conn.stream().as_raw_fd();
        let notify = Arc::new(Notify::new());
        let task_notify = Arc::clone(&notify);

        let (guard, task_guard) = oneshot::channel::<()>();
        let mut poll = mio::Poll::new().context("Failed to create mio Poll")?;
        let mut events = mio::Events::with_capacity(1);
        poll.registry()
            .register(&mut mio::unix::SourceFd(&fd), X11_TOKEN, mio::Interest::READABLE)
            .context("Failed to register X11 FD with mio")?;

        let timeout = Duration::from_millis(100);
        tokio::task::spawn_blocking(move || {
            // Keeps the socket open for as long as it is polled
            let _conn = conn;
            loop {
                if guard.is_closed() {
                    tracing::debug!("X11 socket poller shutting down");
                    return;
                }
                if let Err(err) = poll.poll(&mut events, Some(timeout)) {
                    if err.kind() != std::io::ErrorKind::Interrupted {
                        tracing::warn!("X11 socket poll failed: {:?}", err);
                    }
                    continue;
                }
                if events.iter().any(|event| event.token() == X11_TOKEN) {
                    task_notify.notify_one();
                }
            }
        });

        Ok(Self {
            notify,
            _task_guard: task_guard,
        })
    }

    /// Resolves once the socket has been readable since the last call.
    pub async fn wait_readable(&self) {
        self.notify.notified().await;
    }
}
