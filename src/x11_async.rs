//! Readiness source for the X connection
//!
//! x11rb buffers events internally, so the run loop only needs to know when
//! the socket turns readable. A blocking task polls the fd with mio and pokes
//! a `Notify`. Each turn of the loop then takes a whole batch of events, so
//! one `refresh()` covers everything that arrived together.

use std::os::unix::io::AsRawFd;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{Notify, oneshot};
use x11rb::connection::Connection;
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

const SOCKET: mio::Token = mio::Token(0);

/// How often the watcher checks whether its owner is gone
const WATCH_INTERVAL: Duration = Duration::from_millis(100);

pub struct X11EventStream {
    conn: Arc<RustConnection>,
    readable: Arc<Notify>,
    /// Closed on drop, which ends the watcher
    _owner: oneshot::Receiver<()>,
}

impl X11EventStream {
    pub fn new(conn: Arc<RustConnection>) -> Result<Self> {
        let fd = conn.stream().as_raw_fd();
        let poll = mio::Poll::new().context("Failed to create mio Poll")?;
        poll.registry()
            .register(&mut mio::unix::SourceFd(&fd), SOCKET, mio::Interest::READABLE)
            .context("Failed to register X11 socket with mio")?;

        let readable = Arc::new(Notify::new());
        let (alive, owner) = oneshot::channel::<()>();
        let wake = readable.clone();
        tokio::task::spawn_blocking(move || watch_socket(poll, wake, alive));

        Ok(Self {
            conn,
            readable,
            _owner: owner,
        })
    }

    /// Send buffered requests, then move every queued event into `batch`.
    /// Sleeps on the socket only when nothing is queued yet. Returns how
    /// many events arrived; zero after a stale wakeup.
    pub async fn next_batch(&self, batch: &mut Vec<Event>) -> Result<usize> {
        self.conn.flush().context("Failed to flush X11 requests")?;
        let before = batch.len();
        self.take_queued(batch)?;
        if batch.len() == before {
            self.readable.notified().await;
            self.take_queued(batch)?;
        }
        Ok(batch.len() - before)
    }

    /// Events x11rb read while waiting for replies sit in its buffer, not on
    /// the socket
    fn take_queued(&self, batch: &mut Vec<Event>) -> Result<()> {
        while let Some(event) = self.conn.poll_for_event()? {
            batch.push(event);
        }
        Ok(())
    }
}

fn watch_socket(mut poll: mio::Poll, wake: Arc<Notify>, alive: oneshot::Sender<()>) {
    let mut events = mio::Events::with_capacity(1);
    while !alive.is_closed() {
        if let Err(err) = poll.poll(&mut events, Some(WATCH_INTERVAL)) {
            tracing::warn!("X11 socket poll failed: {:?}", err);
            continue;
        }
        if events.iter().any(|event| event.token() == SOCKET) {
            wake.notify_one();
        }
    }
    tracing::debug!("X11 socket watcher stopped");
}
