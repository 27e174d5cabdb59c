//! Framing reader (spec §4.2, component C2), converted from the socket
//! read loop in `original_source/src/server/server.c` and
//! `original_source/src/client/client.c` (both drive the same two-region
//! buffer shape over a blocking `recv`).
//!
//! Reads from a TCP socket into a two-region buffer: a primary region of
//! `INPUT_BUFFER` bytes and an overflow region of `OVERFLOW_BUFFER` bytes.
//! A single blocking `read` fills the primary region; the cursor then walks
//! it header-by-header, pulling a short second `read` into the overflow
//! region whenever a body straddles the end of what's already buffered.

use std::io::Read;

use crate::consts::{INPUT_BUFFER, OVERFLOW_BUFFER};
use crate::error::{Error, Result};
use crate::packet::{Header, PacketType, HEADER_SIZE};

/// One framed packet: its type and the raw body bytes (still to be decoded
/// by the caller via `packet::decode`).
#[derive(Debug, Clone)]
pub struct Frame {
    pub packet_type: PacketType,
    pub body: Vec<u8>,
}

/// Owns the two-region buffer and the read cursor for one connection.
/// Not `Send`/`Sync` by construction (holds a raw `Vec<u8>` cursor state) —
/// confined to the one thread that owns a socket's read half, matching the
/// original's per-connection single-threaded recv loop.
pub struct FrameReader {
    primary: Vec<u8>,
    filled: usize,
    cursor: usize,
}

impl FrameReader {
    pub fn new() -> Self {
        FrameReader {
            primary: vec![0u8; INPUT_BUFFER],
            filled: 0,
            cursor: 0,
        }
    }

    /// Blocks on one `read` to refill the primary region from `cursor`
    /// onward, then yields every whole frame it can find before needing
    /// more bytes than a `read` at the tail of the stream can supply.
    ///
    /// Returns `Ok(vec![])` only when the peer performed an orderly
    /// shutdown (`read` returned 0) with no further frames pending.
    pub fn read_frames<R: Read>(&mut self, stream: &mut R) -> Result<Vec<Frame>> {
        self.compact();

        let n = stream.read(&mut self.primary[self.filled..])?;
        if n == 0 {
            return Err(Error::Disconnected);
        }
        self.filled += n;

        let mut frames = Vec::new();
        loop {
            let remaining = self.filled - self.cursor;

            if remaining == 0 {
                break;
            }
            if remaining < HEADER_SIZE {
                self.pull_overflow(stream, HEADER_SIZE - remaining)?;
                continue;
            }

            let header = Header::read(&self.primary[self.cursor..self.cursor + HEADER_SIZE])?;
            let packet_type = match PacketType::from_wire(header.packet_type) {
                Some(t) => t,
                // Outside the valid enum range: treat as the tail boundary,
                // not a protocol error — the cursor simply stops here until
                // more bytes (a real next header) arrive.
                None => break,
            };

            let frame_len = HEADER_SIZE + header.size as usize;
            let remaining = self.filled - self.cursor;
            if remaining < frame_len {
                self.pull_overflow(stream, frame_len - remaining)?;
            }

            let body_start = self.cursor + HEADER_SIZE;
            let body_end = self.cursor + frame_len;
            frames.push(Frame {
                packet_type,
                body: self.primary[body_start..body_end].to_vec(),
            });
            self.cursor += frame_len;
        }

        Ok(frames)
    }

    /// Reads exactly `missing` bytes into the overflow region and appends
    /// them to the primary region so the cursor walk can continue as if
    /// the buffer had been one contiguous piece.
    fn pull_overflow<R: Read>(&mut self, stream: &mut R, missing: usize) -> Result<()> {
        if missing > OVERFLOW_BUFFER {
            return Err(Error::Protocol(format!(
                "frame body exceeds overflow buffer: needed {missing}, have {OVERFLOW_BUFFER}"
            )));
        }
        let mut overflow = vec![0u8; missing];
        stream.read_exact(&mut overflow)?;

        if self.filled + missing > self.primary.len() {
            self.primary.resize(self.filled + missing, 0);
        }
        self.primary[self.filled..self.filled + missing].copy_from_slice(&overflow);
        self.filled += missing;
        Ok(())
    }

    /// Drops already-dispatched bytes before `cursor` and rewinds the
    /// cursor and primary/overflow growth back to the start of the buffer,
    /// so a long-lived connection's buffer doesn't grow unbounded.
    fn compact(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.primary.copy_within(self.cursor..self.filled, 0);
        self.filled -= self.cursor;
        self.cursor = 0;
        self.primary.resize(INPUT_BUFFER.max(self.filled), 0);
    }
}

impl Default for FrameReader {
    fn default() -> Self {
        FrameReader::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{encode, PingBody};
    use std::io::Cursor;

    fn encode_n_pings(n: u64) -> Vec<u8> {
        let mut buf = Vec::new();
        for i in 0..n {
            buf.extend_from_slice(&encode(&PingBody { time_ns: i }));
        }
        buf
    }

    /// P2: a concatenation of N well-formed packets, split at an arbitrary
    /// byte boundary across successive reads, is delivered as exactly N
    /// frames in order.
    #[test]
    fn delivers_whole_packets_from_a_single_coalesced_read() {
        let bytes = encode_n_pings(5);
        let mut cursor = Cursor::new(bytes);
        let mut reader = FrameReader::new();

        let frames = reader.read_frames(&mut cursor).unwrap();
        assert_eq!(frames.len(), 5);
        for (i, f) in frames.iter().enumerate() {
            assert_eq!(f.packet_type, PacketType::Ping);
            let body: PingBody = crate::packet::decode(&f.body).unwrap();
            assert_eq!(body.time_ns, i as u64);
        }
    }

    /// P2, arbitrary split: feed the same stream one byte at a time via a
    /// reader that only ever returns 1 byte per call, reassembling via
    /// repeated `read_frames` calls.
    #[test]
    fn reassembles_packets_split_across_many_small_reads() {
        struct OneByteAtATime(Cursor<Vec<u8>>);
        impl Read for OneByteAtATime {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                self.0.read(&mut buf[..1.min(buf.len())])
            }
        }

        let bytes = encode_n_pings(3);
        let mut src = OneByteAtATime(Cursor::new(bytes));
        let mut reader = FrameReader::new();

        let mut collected = Vec::new();
        loop {
            match reader.read_frames(&mut src) {
                Ok(frames) => collected.extend(frames),
                Err(Error::Disconnected) => break,
                Err(e) => panic!("unexpected error: {e}"),
            }
            if collected.len() == 3 {
                break;
            }
        }

        assert_eq!(collected.len(), 3);
        for (i, f) in collected.iter().enumerate() {
            let body: PingBody = crate::packet::decode(&f.body).unwrap();
            assert_eq!(body.time_ns, i as u64);
        }
    }

    #[test]
    fn orderly_shutdown_reports_disconnected() {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        let mut reader = FrameReader::new();
        let err = reader.read_frames(&mut cursor).unwrap_err();
        assert!(matches!(err, Error::Disconnected));
    }
}
