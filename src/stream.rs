//! Live MJPEG republishing.
//!
//! `MjpegStreamer` runs two threads of its own: one accepting viewers, one
//! writing frames out to them. The pipeline only ever hands completed JPEG
//! frames to `publish`, which enqueues and returns; viewer socket writes
//! happen on the writer thread, so a stalled viewer delays its own feed,
//! never inference. When the writer falls behind, newer frames displace
//! nothing; the incoming frame is dropped.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{anyhow, Result};

const BOUNDARY: &str = "perceptdframeboundary";

/// Frames queued for the writer thread before `publish` starts dropping.
const FRAME_QUEUE_DEPTH: usize = 4;

/// Downstream transport for annotated frames.
///
/// The pipeline checks `is_alive` before each publish and skips the cycle's
/// publish (soft-fail) when the transport reports itself down.
pub trait FramePublisher {
    fn is_alive(&self) -> bool;

    /// Push one encoded frame to every viewer of `channel`.
    fn publish(&self, channel: &str, jpeg: &[u8]);
}

/// Multipart JPEG-over-HTTP streamer.
pub struct MjpegStreamer {
    addr: SocketAddr,
    clients: Arc<Mutex<HashMap<String, Vec<TcpStream>>>>,
    frames: SyncSender<(String, Vec<u8>)>,
    shutdown: Arc<AtomicBool>,
    accept_join: Option<JoinHandle<()>>,
    writer_join: Option<JoinHandle<()>>,
}

impl MjpegStreamer {
    /// Bind `addr` and spawn the accept and writer threads. Binding failure
    /// is fatal at startup.
    pub fn start(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr)?;
        let addr = listener.local_addr()?;
        listener.set_nonblocking(true)?;

        let clients: Arc<Mutex<HashMap<String, Vec<TcpStream>>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let shutdown = Arc::new(AtomicBool::new(false));
        let (frames, frame_rx) = mpsc::sync_channel(FRAME_QUEUE_DEPTH);

        let accept_clients = clients.clone();
        let accept_shutdown = shutdown.clone();
        let accept_join = std::thread::spawn(move || {
            run_accept_loop(listener, accept_clients, accept_shutdown);
        });

        let writer_clients = clients.clone();
        let writer_shutdown = shutdown.clone();
        let writer_join = std::thread::spawn(move || {
            run_writer_loop(frame_rx, writer_clients, writer_shutdown);
        });

        log::info!("mjpeg streamer listening on {}", addr);
        Ok(Self {
            addr,
            clients,
            frames,
            shutdown,
            accept_join: Some(accept_join),
            writer_join: Some(writer_join),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Current viewer count across all channels.
    pub fn viewer_count(&self) -> usize {
        self.clients
            .lock()
            .map(|map| map.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    /// Stop both threads and drop all viewers.
    pub fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.accept_join.take() {
            join.join()
                .map_err(|_| anyhow!("mjpeg accept thread panicked"))?;
        }
        if let Some(join) = self.writer_join.take() {
            join.join()
                .map_err(|_| anyhow!("mjpeg writer thread panicked"))?;
        }
        Ok(())
    }
}

impl FramePublisher for MjpegStreamer {
    fn is_alive(&self) -> bool {
        !self.shutdown.load(Ordering::SeqCst)
    }

    /// Enqueue one frame for the writer thread. Never blocks: with the queue
    /// full the frame is dropped and the viewers skip a frame.
    fn publish(&self, channel: &str, jpeg: &[u8]) {
        match self.frames.try_send((channel.to_string(), jpeg.to_vec())) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                log::debug!("viewer writes backlogged, dropping frame for {}", channel);
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

fn run_accept_loop(
    listener: TcpListener,
    clients: Arc<Mutex<HashMap<String, Vec<TcpStream>>>>,
    shutdown: Arc<AtomicBool>,
) {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        match listener.accept() {
            Ok((stream, peer)) => match register_viewer(stream, &clients) {
                Ok(channel) => log::info!("viewer {} subscribed to {}", peer, channel),
                Err(err) => log::warn!("viewer {} rejected: {}", peer, err),
            },
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(50));
            }
            Err(err) => {
                log::error!("mjpeg accept failed: {}", err);
                break;
            }
        }
    }
}

fn run_writer_loop(
    frames: mpsc::Receiver<(String, Vec<u8>)>,
    clients: Arc<Mutex<HashMap<String, Vec<TcpStream>>>>,
    shutdown: Arc<AtomicBool>,
) {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        let (channel, jpeg) = match frames.recv_timeout(Duration::from_millis(50)) {
            Ok(item) => item,
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        };
        let Ok(mut map) = clients.lock() else {
            break;
        };
        let Some(viewers) = map.get_mut(&channel) else {
            continue;
        };
        // Dead sockets are dropped on write failure.
        viewers.retain_mut(|stream| write_part(stream, &jpeg).is_ok());
    }
}

/// Read the request line, answer with a multipart header, and park the
/// socket on its channel's viewer list.
fn register_viewer(
    stream: TcpStream,
    clients: &Arc<Mutex<HashMap<String, Vec<TcpStream>>>>,
) -> Result<String> {
    stream.set_read_timeout(Some(Duration::from_secs(2)))?;
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;

    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default();
    let path = parts.next().unwrap_or_default();
    if method != "GET" || path.is_empty() {
        return Err(anyhow!("malformed request line: {:?}", request_line.trim()));
    }

    // Drain the remaining request headers.
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line)?;
        if n == 0 || line == "\r\n" || line == "\n" {
            break;
        }
    }

    let mut stream = stream;
    write!(
        stream,
        "HTTP/1.1 200 OK\r\n\
         Connection: close\r\n\
         Cache-Control: no-cache\r\n\
         Pragma: no-cache\r\n\
         Content-Type: multipart/x-mixed-replace; boundary={}\r\n\r\n",
        BOUNDARY
    )?;
    stream.set_read_timeout(None)?;
    // A stalled viewer must not wedge the publish path.
    stream.set_write_timeout(Some(Duration::from_secs(2)))?;

    let channel = path.to_string();
    clients
        .lock()
        .map_err(|_| anyhow!("viewer table poisoned"))?
        .entry(channel.clone())
        .or_default()
        .push(stream);
    Ok(channel)
}

fn write_part(stream: &mut TcpStream, jpeg: &[u8]) -> std::io::Result<()> {
    write!(
        stream,
        "--{}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        BOUNDARY,
        jpeg.len()
    )?;
    stream.write_all(jpeg)?;
    stream.write_all(b"\r\n")?;
    stream.flush()
}
