// Directory server: TCP listener and main event loop.
//
// Architecture: thread-per-reader with a central `mpsc` channel.
//
// - **Listener thread**: accepts connections and sends
//   `InternalEvent::NewConnection` to the main thread.
// - **Reader threads** (one per connection): read framed `DirectoryRequest`s
//   and forward them as `InternalEvent::RequestFrom`. On EOF, error, or a
//   malformed frame they send `InternalEvent::Disconnected` and exit.
// - **Main thread**: owns the `Registry` and is the only writer to client
//   streams.
//
// Hosts keep their registering connection open for the life of the room, so
// a disconnect doubles as the release signal. Joiners open a connection per
// lookup and close it after the reply.
//
// Shutdown: `DirectoryHandle::stop` clears `keep_running`; the main loop
// notices within one poll interval.

use std::io::{self, BufReader};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use imposter_protocol::framing::recv_json;
use imposter_protocol::message::DirectoryRequest;
use tracing::{debug, info, warn};

use crate::registry::{ConnectionId, Registry};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

enum InternalEvent {
    NewConnection {
        stream: TcpStream,
    },
    RequestFrom {
        connection: ConnectionId,
        request: DirectoryRequest,
    },
    Disconnected {
        connection: ConnectionId,
    },
}

/// Handle returned by `start_directory` to control the running server.
pub struct DirectoryHandle {
    keep_running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl DirectoryHandle {
    /// Signal the server to stop and wait for it to shut down.
    pub fn stop(mut self) {
        self.keep_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }

    /// Block until the server exits.
    pub fn wait(mut self) {
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

#[derive(Clone, Debug)]
pub struct DirectoryConfig {
    pub bind_address: String,
    pub port: u16,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".into(),
            port: 7878,
        }
    }
}

/// Start the directory server on a background thread. Returns a handle and
/// the bound address (port 0 lets the OS choose).
pub fn start_directory(config: DirectoryConfig) -> io::Result<(DirectoryHandle, SocketAddr)> {
    let listener = TcpListener::bind((config.bind_address.as_str(), config.port))?;
    let addr = listener.local_addr()?;
    let keep_running = Arc::new(AtomicBool::new(true));
    let keep_running_clone = keep_running.clone();

    let thread = thread::spawn(move || {
        run_directory(listener, keep_running_clone);
    });

    info!(%addr, "directory listening");
    Ok((
        DirectoryHandle {
            keep_running,
            thread: Some(thread),
        },
        addr,
    ))
}

fn run_directory(listener: TcpListener, keep_running: Arc<AtomicBool>) {
    let mut registry = Registry::new();
    let (tx, rx): (Sender<InternalEvent>, Receiver<InternalEvent>) = mpsc::channel();

    if let Err(e) = listener.set_nonblocking(true) {
        warn!(error = %e, "directory listener stays blocking");
    }

    let keep_running_listener = keep_running.clone();
    let tx_listener = tx.clone();
    thread::spawn(move || {
        while keep_running_listener.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok((stream, _addr)) => {
                    stream.set_nonblocking(false).ok();
                    let _ = tx_listener.send(InternalEvent::NewConnection { stream });
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(50));
                }
                Err(e) => {
                    warn!(error = %e, "directory accept failed");
                    break;
                }
            }
        }
    });

    while keep_running.load(Ordering::SeqCst) {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(event) => {
                handle_event(&mut registry, event, &tx);
                while let Ok(event) = rx.try_recv() {
                    handle_event(&mut registry, event, &tx);
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
    info!("directory stopped");
}

fn handle_event(registry: &mut Registry, event: InternalEvent, tx: &Sender<InternalEvent>) {
    match event {
        InternalEvent::NewConnection { stream } => {
            let read_half = match stream.try_clone() {
                Ok(s) => s,
                Err(e) => {
                    warn!(error = %e, "could not clone directory connection");
                    return;
                }
            };
            let connection = registry.add_connection(stream);
            debug!(connection = connection.0, "directory connection opened");
            let tx_reader = tx.clone();
            thread::spawn(move || {
                reader_loop(BufReader::new(read_half), connection, tx_reader);
            });
        }
        InternalEvent::RequestFrom {
            connection,
            request,
        } => registry.handle(connection, request),
        InternalEvent::Disconnected { connection } => {
            debug!(connection = connection.0, "directory connection closed");
            registry.remove_connection(connection);
        }
    }
}

fn reader_loop(
    mut reader: BufReader<TcpStream>,
    connection: ConnectionId,
    tx: Sender<InternalEvent>,
) {
    loop {
        match recv_json::<_, DirectoryRequest>(&mut reader) {
            Ok(request) => {
                if tx
                    .send(InternalEvent::RequestFrom {
                        connection,
                        request,
                    })
                    .is_err()
                {
                    break;
                }
            }
            Err(e) => {
                if !e.is_disconnect() {
                    debug!(connection = connection.0, error = %e, "dropping directory connection");
                }
                let _ = tx.send(InternalEvent::Disconnected { connection });
                break;
            }
        }
    }
}
