//! Error taxonomy (spec §7), converted from the `ERR_FATAL` / `ERR_DROP` /
//! `ERR_QUIT` split in `myq2_common::qcommon` (`com_error`).

use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// Unknown packet type, declared-size mismatch, or a frame that cannot
    /// be completed. Closes the one connection; never propagates.
    Protocol(String),
    /// Transient or fatal OS-level I/O failure.
    Io(std::io::Error),
    /// Peer performed an orderly shutdown (`recv` returned 0).
    Disconnected,
    /// No free player slot, or a bounded queue was full.
    SlotUnavailable,
    /// A logged-and-continued invariant violation (e.g. damaged player not
    /// found). Carried as an error so call sites can choose to log and
    /// move on rather than unwind.
    Invariant(String),
    /// Bind failure, addrinfo failure, or any condition that should exit
    /// the process with a non-zero code.
    Fatal(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Protocol(msg) => write!(f, "protocol error: {msg}"),
            Error::Io(e) => write!(f, "io error: {e}"),
            Error::Disconnected => write!(f, "peer disconnected"),
            Error::SlotUnavailable => write!(f, "no slot available"),
            Error::Invariant(msg) => write!(f, "invariant violation: {msg}"),
            Error::Fatal(msg) => write!(f, "fatal: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::Disconnected
        } else {
            Error::Io(e)
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
