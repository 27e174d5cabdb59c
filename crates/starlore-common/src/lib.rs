pub mod chunk;
pub mod consts;
pub mod error;
pub mod framing;
pub mod handshake;
pub mod log;
pub mod math;
pub mod message;
pub mod noise;
pub mod packet;
pub mod player;
pub mod world;

use std::io::Write;
use std::net::TcpStream;

use parking_lot::Mutex;

pub use error::{Error, Result};

/// Serializes writes to one connection's socket across threads (spec §5:
/// the network thread and the simulation/broadcast thread both send on the
/// same socket). Mirrors the teacher's `Arc<Mutex<TcpStream>>` ownership of
/// a client's write half in `net_tcp.rs`.
pub struct PacketWriter {
    stream: Mutex<TcpStream>,
}

impl PacketWriter {
    pub fn new(stream: TcpStream) -> Self {
        PacketWriter { stream: Mutex::new(stream) }
    }

    pub fn send(&self, bytes: &[u8]) -> Result<()> {
        self.stream.lock().write_all(bytes).map_err(Error::from)
    }

    pub fn try_clone(&self) -> Result<TcpStream> {
        self.stream.lock().try_clone().map_err(Error::from)
    }
}
