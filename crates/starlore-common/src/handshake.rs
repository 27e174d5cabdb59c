//! Connection-validation handshake (spec §4.3, component C3), converted
//! from `validate_incoming_client` in `original_source/src/server/server.c`
//! and its mirror in `original_source/src/client/client.c`.
//!
//! Not cryptographic — a protocol sanity check. The byte layout (three
//! fixed-width little-endian fields: `u64` puzzle, `u64` answer, `u8`
//! status) is part of the wire contract and must not change shape.

use std::io::{Read, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::consts::HANDSHAKE_XOR_CONSTANT;
use crate::error::{Error, Result};

/// Server side: send an 8-byte puzzle, read the client's answer, verify,
/// and reply with a single accept/reject byte. Returns whether the client
/// passed.
pub fn server_validate<S: Read + Write>(stream: &mut S) -> Result<bool> {
    let puzzle = monotonic_seed();
    stream.write_all(&puzzle.to_le_bytes())?;

    let mut answer_buf = [0u8; 8];
    stream.read_exact(&mut answer_buf)?;
    let answer = u64::from_le_bytes(answer_buf);

    let accepted = answer == (puzzle ^ HANDSHAKE_XOR_CONSTANT);
    stream.write_all(&[accepted as u8])?;
    Ok(accepted)
}

/// Client side: read the server's puzzle, answer it, then read the
/// accept/reject byte. Returns whether the server accepted the connection.
pub fn client_validate<S: Read + Write>(stream: &mut S) -> Result<bool> {
    let mut puzzle_buf = [0u8; 8];
    stream.read_exact(&mut puzzle_buf)?;
    let puzzle = u64::from_le_bytes(puzzle_buf);

    let answer = puzzle ^ HANDSHAKE_XOR_CONSTANT;
    stream.write_all(&answer.to_le_bytes())?;

    let mut status = [0u8; 1];
    stream.read_exact(&mut status)?;
    parse_status_byte(status[0])
}

/// Seeds the puzzle from a monotonic nanosecond clock, matching
/// `clock_get_absolute_time_ns()` in the original. `SystemTime` isn't
/// strictly monotonic, but the puzzle only needs to be unpredictable
/// enough to rule out a stale or replayed answer, not immune to clock
/// adjustment.
fn monotonic_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Rejects an accept/reject byte outside `{0, 1}` as a protocol violation
/// rather than silently treating any nonzero byte as acceptance; used by
/// callers that want to distinguish a malformed peer from a clean reject.
pub fn parse_status_byte(byte: u8) -> Result<bool> {
    match byte {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(Error::Protocol(format!("invalid handshake status byte {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// A duplex in-memory stream: reads come from `inbound`, writes go to
    /// `outbound`, so a single `Read + Write` type can stand in for a
    /// socket on each side of the handshake in a test.
    struct Duplex {
        inbound: Cursor<Vec<u8>>,
        outbound: Vec<u8>,
    }

    impl Read for Duplex {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.inbound.read(buf)
        }
    }

    impl Write for Duplex {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.outbound.extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// End-to-end over a real loopback socket: a correctly answering client
    /// is accepted by the server side.
    #[test]
    fn loopback_handshake_accepts_a_correct_client() {
        use std::net::{TcpListener, TcpStream};

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server_thread = std::thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            server_validate(&mut socket).unwrap()
        });

        let mut client_socket = TcpStream::connect(addr).unwrap();
        let client_accepted = client_validate(&mut client_socket).unwrap();
        let server_accepted = server_thread.join().unwrap();

        assert!(client_accepted);
        assert!(server_accepted);
    }

    #[test]
    fn client_validate_answers_with_xor_and_reads_status() {
        let puzzle: u64 = 42;
        let mut inbound = Vec::new();
        inbound.extend_from_slice(&puzzle.to_le_bytes());
        inbound.push(1); // server accepts

        let mut stream = Duplex {
            inbound: Cursor::new(inbound),
            outbound: Vec::new(),
        };

        let accepted = client_validate(&mut stream).unwrap();
        assert!(accepted);

        let expected_answer = puzzle ^ HANDSHAKE_XOR_CONSTANT;
        assert_eq!(stream.outbound, expected_answer.to_le_bytes());
    }

    #[test]
    fn client_validate_reports_rejection() {
        let puzzle: u64 = 7;
        let mut inbound = Vec::new();
        inbound.extend_from_slice(&puzzle.to_le_bytes());
        inbound.push(0);

        let mut stream = Duplex {
            inbound: Cursor::new(inbound),
            outbound: Vec::new(),
        };

        assert!(!client_validate(&mut stream).unwrap());
    }

    #[test]
    fn parse_status_byte_rejects_garbage() {
        assert!(parse_status_byte(2).is_err());
        assert_eq!(parse_status_byte(0).unwrap(), false);
        assert_eq!(parse_status_byte(1).unwrap(), true);
    }
}
