//! WebSocket push channel for live reload.
//!
//! Browsers connect via the bootstrap snippet; a rebuild broadcasts a
//! `changed` text frame and the page reloads itself. Clients that fail a
//! send are dropped on the next broadcast.

use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tungstenite::{Message, WebSocket};

use crate::error::PipelineError;
use crate::{debug, log};

/// Ports tried above the configured one when it is taken.
const MAX_PORT_RETRIES: u16 = 10;

/// Polling interval of the nonblocking accept loop.
const ACCEPT_POLL: Duration = Duration::from_millis(100);

/// Accepts reload clients and broadcasts change notifications.
///
/// Dropping the server stops the acceptor thread and releases the port.
pub struct ReloadServer {
    port: u16,
    clients: Arc<Mutex<Vec<WebSocket<TcpStream>>>>,
    shutdown: Arc<AtomicBool>,
}

impl ReloadServer {
    /// Bind near `base_port` and start the acceptor thread.
    pub fn start(base_port: u16) -> Result<Arc<Self>, PipelineError> {
        let (listener, port) = try_bind_port(base_port, MAX_PORT_RETRIES)?;
        if port != base_port {
            log!("reload"; "port {base_port} taken, using {port}");
        }
        listener.set_nonblocking(true).map_err(|e| PipelineError::Watch {
            message: e.to_string(),
        })?;

        let server = Arc::new(Self {
            port,
            clients: Arc::new(Mutex::new(Vec::new())),
            shutdown: Arc::new(AtomicBool::new(false)),
        });

        let clients = server.clients.clone();
        let shutdown = server.shutdown.clone();
        std::thread::spawn(move || {
            while !shutdown.load(Ordering::Relaxed) {
                match listener.accept() {
                    Ok((stream, addr)) => {
                        // Handshake and sends are blocking operations.
                        let _ = stream.set_nonblocking(false);
                        match tungstenite::accept(stream) {
                            Ok(socket) => {
                                debug!("reload"; "client connected: {addr}");
                                clients.lock().push(socket);
                            }
                            Err(e) => debug!("reload"; "handshake failed: {e}"),
                        }
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        std::thread::sleep(ACCEPT_POLL);
                    }
                    Err(e) => {
                        log!("reload"; "accept error: {e}");
                        std::thread::sleep(ACCEPT_POLL);
                    }
                }
            }
            // Thread exit drops the listener and frees the port.
        });

        Ok(server)
    }

    /// Port actually bound (may differ from the configured one).
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().len()
    }

    /// Send the change notification to every client, pruning the dead.
    pub fn broadcast(&self) {
        let mut clients = self.clients.lock();
        clients.retain_mut(|socket| {
            socket
                .send(Message::text("changed"))
                .inspect_err(|e| debug!("reload"; "dropping client: {e}"))
                .is_ok()
        });
        debug!("reload"; "notified {} client(s)", clients.len());
    }
}

impl Drop for ReloadServer {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

/// Bind the base port, or walk upward when it is in use.
fn try_bind_port(base_port: u16, max_retries: u16) -> Result<(TcpListener, u16), PipelineError> {
    let mut last_error = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind(format!("127.0.0.1:{port}")) {
            Ok(listener) => {
                // Resolve the real port for ephemeral binds (base 0).
                let actual = listener
                    .local_addr()
                    .map_err(|e| PipelineError::Watch {
                        message: e.to_string(),
                    })?
                    .port();
                return Ok((listener, actual));
            }
            Err(e) => {
                last_error = Some(e);
                continue;
            }
        }
    }

    Err(PipelineError::Watch {
        message: format!(
            "no free reload port after {max_retries} attempts: {}",
            last_error.map(|e| e.to_string()).unwrap_or_default()
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_bind_walks_past_taken_port() {
        let holder = TcpListener::bind("127.0.0.1:0").unwrap();
        let taken = holder.local_addr().unwrap().port();

        let server = ReloadServer::start(taken).unwrap();
        assert_ne!(server.port(), taken);
    }

    #[test]
    fn test_broadcast_reaches_client() {
        let server = ReloadServer::start(0).unwrap();
        let (mut socket, _) =
            tungstenite::connect(format!("ws://127.0.0.1:{}", server.port())).unwrap();

        // Wait for the acceptor thread to register the client.
        for _ in 0..50 {
            if server.client_count() == 1 {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(server.client_count(), 1);

        server.broadcast();
        let message = socket.read().unwrap();
        assert_eq!(message, Message::text("changed"));
    }

    #[test]
    fn test_drop_releases_port() {
        let server = ReloadServer::start(0).unwrap();
        let port = server.port();
        drop(server);

        // The acceptor polls its shutdown flag between accepts.
        for _ in 0..50 {
            if TcpListener::bind(("127.0.0.1", port)).is_ok() {
                return;
            }
            std::thread::sleep(Duration::from_millis(50));
        }
        panic!("port still held after drop");
    }

    #[test]
    fn test_dead_clients_pruned() {
        let server = ReloadServer::start(0).unwrap();
        let (socket, _) =
            tungstenite::connect(format!("ws://127.0.0.1:{}", server.port())).unwrap();

        for _ in 0..50 {
            if server.client_count() == 1 {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        drop(socket);
        std::thread::sleep(Duration::from_millis(50));

        // First broadcast may succeed into the closed socket's buffers;
        // repeated ones surface the error and prune.
        server.broadcast();
        server.broadcast();
        assert_eq!(server.client_count(), 0);
    }
}
