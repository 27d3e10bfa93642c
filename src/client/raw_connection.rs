//! Blocking TCP connection to a pika instance
//!
//! One connection is opened per instance per scrape and dropped when the
//! scrape of that instance finishes. All socket operations are bounded by
//! the factory's timeouts so a stalled instance cannot hold a scrape forever.

use std::io::{self, BufReader, BufWriter, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

use super::control_plane::{ControlPlane, ControlPlaneExt};
use crate::discovery::Instance;
use crate::utils::{ConnectionError, RespDecoder, RespEncoder, RespValue};

/// TCP connection with split buffered reader/writer
pub struct RawConnection {
    addr: String,
    writer: BufWriter<TcpStream>,
    reader: BufReader<TcpStream>,
    encoder: RespEncoder,
}

impl RawConnection {
    /// Connect to `addr` ("host:port")
    pub fn connect_tcp(addr: &str, connect_timeout: Duration) -> Result<Self, ConnectionError> {
        let connect_failed = |source: io::Error| ConnectionError::ConnectFailed {
            addr: addr.to_string(),
            source,
        };

        let socket_addr = addr
            .to_socket_addrs()
            .map_err(|_| ConnectionError::InvalidAddress(addr.to_string()))?
            .next()
            .ok_or_else(|| {
                connect_failed(io::Error::new(io::ErrorKind::NotFound, "No addresses found"))
            })?;

        let stream = TcpStream::connect_timeout(&socket_addr, connect_timeout).map_err(connect_failed)?;
        stream.set_nodelay(true).ok();

        let writer = BufWriter::with_capacity(4096, stream.try_clone().map_err(connect_failed)?);
        let reader = BufReader::with_capacity(65536, stream);

        Ok(Self {
            addr: addr.to_string(),
            writer,
            reader,
            encoder: RespEncoder::with_capacity(256),
        })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.reader.get_ref().set_read_timeout(timeout)
    }

    pub fn set_write_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.writer.get_ref().set_write_timeout(timeout)
    }
}

impl ControlPlane for RawConnection {
    fn execute(&mut self, args: &[&str]) -> io::Result<RespValue> {
        self.encoder.clear();
        self.encoder.encode_command_str(args);
        self.writer.write_all(self.encoder.as_bytes())?;
        self.writer.flush()?;
        RespDecoder::new(&mut self.reader).decode()
    }
}

/// Opens an authenticated command connection for an instance
pub trait Connector: Send + Sync {
    fn connect(&self, instance: &Instance) -> Result<Box<dyn ControlPlane + Send>, ConnectionError>;
}

/// Connection factory with the exporter's socket timeouts
#[derive(Debug, Clone)]
pub struct ConnectionFactory {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
}

impl Default for ConnectionFactory {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(5),
        }
    }
}

impl ConnectionFactory {
    /// Connect, apply timeouts and AUTH when the instance has a password
    pub fn create(&self, instance: &Instance) -> Result<RawConnection, ConnectionError> {
        let mut conn = RawConnection::connect_tcp(&instance.addr, self.connect_timeout)?;

        conn.set_read_timeout(Some(self.read_timeout)).ok();
        conn.set_write_timeout(Some(self.write_timeout)).ok();

        if !instance.password.is_empty() {
            conn.authenticate(&instance.password)
                .map_err(|e| ConnectionError::AuthFailed(e.to_string()))?;
        }

        debug!("Connected to {} ({})", instance.addr, instance.alias);
        Ok(conn)
    }
}

impl Connector for ConnectionFactory {
    fn connect(&self, instance: &Instance) -> Result<Box<dyn ControlPlane + Send>, ConnectionError> {
        Ok(Box::new(self.create(instance)?))
    }
}
