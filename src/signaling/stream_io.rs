use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, ServerConfig, ServerConnection, StreamOwned};

/// How long a TLS reader holds the stream lock before letting a writer in.
const TLS_READ_SLICE: Duration = Duration::from_millis(50);

/// Upper bound on a stalled TLS handshake.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// The two halves of one connection, ready for a reader and a writer thread.
///
/// `closer` is a handle on the raw socket used to tear the connection down
/// from either side.
pub struct ConnectionIo {
    pub reader: Box<dyn Read + Send>,
    pub writer: Box<dyn Write + Send>,
    pub closer: TcpStream,
}

impl ConnectionIo {
    /// Plain TCP: each half gets its own clone of the socket.
    pub fn plain(stream: TcpStream) -> io::Result<Self> {
        let _ = stream.set_nodelay(true);
        Ok(Self {
            reader: Box::new(stream.try_clone()?),
            writer: Box::new(stream.try_clone()?),
            closer: stream,
        })
    }

    /// Server side of a TLS connection. Blocks until the handshake is done
    /// or `HANDSHAKE_TIMEOUT` passes without progress.
    pub fn server_tls(mut stream: TcpStream, config: Arc<ServerConfig>) -> io::Result<Self> {
        let mut conn = ServerConnection::new(config)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("TLS setup: {e}")))?;
        stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT))?;
        while conn.is_handshaking() {
            conn.complete_io(&mut stream)?;
        }
        Self::tls(StreamOwned::new(conn, stream))
    }

    /// Client side of a TLS connection to `server_name`.
    pub fn client_tls(
        mut stream: TcpStream,
        config: Arc<ClientConfig>,
        server_name: &str,
    ) -> io::Result<Self> {
        let name = ServerName::try_from(server_name.to_owned())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, format!("server name: {e}")))?;
        let mut conn = ClientConnection::new(config, name)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("TLS setup: {e}")))?;
        stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT))?;
        while conn.is_handshaking() {
            conn.complete_io(&mut stream)?;
        }
        Self::tls(StreamOwned::new(conn, stream))
    }

    /// Splits an established TLS stream. Both halves share the session; the
    /// short read timeout keeps a blocked reader from starving the writer.
    fn tls<C>(stream: StreamOwned<C, TcpStream>) -> io::Result<Self>
    where
        StreamOwned<C, TcpStream>: Read + Write + Send + 'static,
    {
        let _ = stream.sock.set_nodelay(true);
        stream.sock.set_read_timeout(Some(TLS_READ_SLICE))?;
        let closer = stream.sock.try_clone()?;
        let shared = Arc::new(Mutex::new(stream));
        Ok(Self {
            reader: Box::new(SharedReader {
                inner: shared.clone(),
            }),
            writer: Box::new(SharedWriter { inner: shared }),
            closer,
        })
    }

    /// Shuts the socket down in both directions, waking any blocked reader.
    pub fn close(closer: &TcpStream) {
        let _ = closer.shutdown(Shutdown::Both);
    }
}

/// Runs `op` on the locked stream, retrying while it only timed out.
///
/// The lock is dropped between attempts so the other half can get in.
fn locked_retry<T, R>(
    inner: &Mutex<T>,
    mut op: impl FnMut(&mut T) -> io::Result<R>,
) -> io::Result<R> {
    loop {
        let res = {
            let mut guard = inner
                .lock()
                .map_err(|_| io::Error::other("stream lock poisoned"))?;
            op(&mut guard)
        };
        match res {
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                std::thread::yield_now();
            }
            other => return other,
        }
    }
}

struct SharedReader<T> {
    inner: Arc<Mutex<T>>,
}

impl<T: Read> Read for SharedReader<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        locked_retry(&self.inner, |s| s.read(buf))
    }
}

struct SharedWriter<T> {
    inner: Arc<Mutex<T>>,
}

impl<T: Write> Write for SharedWriter<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        locked_retry(&self.inner, |s| s.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        locked_retry(&self.inner, |s| s.flush())
    }
}
