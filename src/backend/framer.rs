//! Line framing over a serial byte stream
//!
//! [`LineFramer`] turns the raw bytes of an open port into newline-delimited
//! text lines. It is a lazy, non-restartable sequence: each call performs at
//! most one read on the underlying stream, so the caller gets control back at
//! least once per read timeout even when the device is silent.
//!
//! # Decoding
//!
//! Lines are decoded as UTF-8. Invalid bytes do not stop the stream; the line
//! is yielded as [`Frame::Undecodable`] with a lossy decoding so the caller can
//! report it and move on.

use crate::error::{PlotterError, Result};
use std::io::{ErrorKind, Read};

/// Size of a single read from the port
const READ_CHUNK_SIZE: usize = 1024;

/// Bytes accumulated without a newline before the framer force-flushes a line
pub const MAX_LINE_LEN: usize = 4096;

/// One step of the framer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A complete line, delimiter and trailing `\r` stripped
    Line(String),
    /// A complete line that was not valid UTF-8, decoded lossily
    Undecodable(String),
    /// The read timed out or did not complete a line yet
    Idle,
}

/// Splits a byte stream into text lines
pub struct LineFramer<R> {
    reader: R,
    pending: Vec<u8>,
    chunk: Box<[u8]>,
    bytes_read: u64,
    faulted: bool,
}

impl<R: Read> LineFramer<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pending: Vec::with_capacity(256),
            chunk: vec![0u8; READ_CHUNK_SIZE].into_boxed_slice(),
            bytes_read: 0,
            faulted: false,
        }
    }

    /// Total bytes received so far
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Produce the next frame, reading from the stream at most once
    ///
    /// Timeouts are not errors; they surface as [`Frame::Idle`]. A zero-length
    /// read means the device went away and is reported as a stream fault.
    pub fn next_frame(&mut self) -> Result<Frame> {
        if let Some(frame) = self.take_line() {
            return Ok(frame);
        }

        let n = loop {
            match self.reader.read(&mut self.chunk) {
                Ok(0) => {
                    self.faulted = true;
                    return Err(PlotterError::StreamFault(
                        "device closed the stream".to_string(),
                    ));
                }
                Ok(n) => break n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    return Ok(Frame::Idle);
                }
                Err(e) => {
                    self.faulted = true;
                    return Err(PlotterError::StreamFault(e.to_string()));
                }
            }
        };

        self.bytes_read += n as u64;
        self.pending.extend_from_slice(&self.chunk[..n]);

        if let Some(frame) = self.take_line() {
            return Ok(frame);
        }

        if self.pending.len() >= MAX_LINE_LEN {
            tracing::warn!(
                "No line delimiter in {} bytes, flushing as one line",
                self.pending.len()
            );
            // A character split by the read stays pending for the next line
            let rest = self.pending.split_off(flush_point(&self.pending));
            let raw = std::mem::replace(&mut self.pending, rest);
            return Ok(decode(raw));
        }

        Ok(Frame::Idle)
    }

    /// Pop one complete line out of the pending bytes
    fn take_line(&mut self) -> Option<Frame> {
        let pos = self.pending.iter().position(|&b| b == b'\n')?;
        let mut raw: Vec<u8> = self.pending.drain(..=pos).collect();
        raw.pop();
        if raw.last() == Some(&b'\r') {
            raw.pop();
        }
        Some(decode(raw))
    }
}

/// Length of `bytes` without a trailing, still incomplete UTF-8 sequence
fn flush_point(bytes: &[u8]) -> usize {
    let start = bytes
        .iter()
        .rev()
        .take(4)
        .position(|b| (b & 0xC0) != 0x80)
        .map_or(bytes.len(), |back| bytes.len() - 1 - back);
    match std::str::from_utf8(&bytes[start..]) {
        Err(e) if e.error_len().is_none() && start > 0 => start,
        _ => bytes.len(),
    }
}

fn decode(raw: Vec<u8>) -> Frame {
    match String::from_utf8(raw) {
        Ok(text) => Frame::Line(text),
        Err(e) => Frame::Undecodable(String::from_utf8_lossy(e.as_bytes()).into_owned()),
    }
}

impl<R: Read> Iterator for LineFramer<R> {
    type Item = Result<Frame>;

    /// Yields frames until the stream faults, then ends
    fn next(&mut self) -> Option<Self::Item> {
        if self.faulted {
            return None;
        }
        Some(self.next_frame())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io;

    /// Replays a list of read results, then times out forever
    struct Replay(VecDeque<io::Result<Vec<u8>>>);

    impl Read for Replay {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.pop_front() {
                Some(Ok(mut bytes)) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    if n < bytes.len() {
                        self.0.push_front(Ok(bytes.split_off(n)));
                    }
                    Ok(n)
                }
                Some(Err(e)) => Err(e),
                None => Err(io::Error::new(ErrorKind::TimedOut, "timeout")),
            }
        }
    }

    fn framer(chunks: Vec<io::Result<Vec<u8>>>) -> LineFramer<Replay> {
        LineFramer::new(Replay(chunks.into_iter().collect()))
    }

    #[test]
    fn test_splits_lines_and_strips_crlf() {
        let mut f = framer(vec![Ok(b"Accel: [1,2,3]\r\nhello\n".to_vec())]);
        assert_eq!(f.next_frame().unwrap(), Frame::Line("Accel: [1,2,3]".into()));
        assert_eq!(f.next_frame().unwrap(), Frame::Line("hello".into()));
        assert_eq!(f.next_frame().unwrap(), Frame::Idle);
        assert_eq!(f.bytes_read(), 23);
    }

    #[test]
    fn test_line_split_across_reads() {
        let mut f = framer(vec![Ok(b"Acc".to_vec()), Ok(b"el: [1,2,3]\n".to_vec())]);
        assert_eq!(f.next_frame().unwrap(), Frame::Idle);
        assert_eq!(f.next_frame().unwrap(), Frame::Line("Accel: [1,2,3]".into()));
    }

    #[test]
    fn test_timeout_is_idle_not_error() {
        let mut f = framer(vec![Err(io::Error::new(ErrorKind::TimedOut, "t"))]);
        assert_eq!(f.next_frame().unwrap(), Frame::Idle);
        assert_eq!(f.next_frame().unwrap(), Frame::Idle);
    }

    #[test]
    fn test_interrupted_is_retried() {
        let mut f = framer(vec![
            Err(io::Error::new(ErrorKind::Interrupted, "signal")),
            Ok(b"x\n".to_vec()),
        ]);
        assert_eq!(f.next_frame().unwrap(), Frame::Line("x".into()));
    }

    #[test]
    fn test_invalid_utf8_is_undecodable() {
        let mut f = framer(vec![Ok(vec![b'A', 0xFF, b'B', b'\n', b'o', b'k', b'\n'])]);
        assert_eq!(f.next_frame().unwrap(), Frame::Undecodable("A\u{FFFD}B".into()));
        assert_eq!(f.next_frame().unwrap(), Frame::Line("ok".into()));
    }

    #[test]
    fn test_eof_is_stream_fault_and_ends_iteration() {
        let mut f = framer(vec![Ok(Vec::new())]);
        assert!(matches!(f.next(), Some(Err(PlotterError::StreamFault(_)))));
        assert!(f.next().is_none());
    }

    #[test]
    fn test_io_error_is_stream_fault() {
        let mut f = framer(vec![Err(io::Error::new(ErrorKind::BrokenPipe, "unplugged"))]);
        match f.next_frame() {
            Err(PlotterError::StreamFault(msg)) => assert!(msg.contains("unplugged")),
            other => panic!("expected stream fault, got {:?}", other),
        }
    }

    #[test]
    fn test_overlong_line_is_flushed() {
        let mut f = framer(vec![Ok(vec![b'a'; MAX_LINE_LEN])]);
        let reads = MAX_LINE_LEN / READ_CHUNK_SIZE;
        for _ in 1..reads {
            assert_eq!(f.next_frame().unwrap(), Frame::Idle);
        }
        match f.next_frame().unwrap() {
            Frame::Line(text) => assert_eq!(text.len(), MAX_LINE_LEN),
            other => panic!("expected flushed line, got {:?}", other),
        }
    }

    #[test]
    fn test_overlong_flush_keeps_split_char_whole() {
        let mut bytes = vec![b'a'; MAX_LINE_LEN - 1];
        bytes.extend_from_slice("ébc\n".as_bytes());
        let mut f = framer(vec![Ok(bytes)]);

        for _ in 1..MAX_LINE_LEN / READ_CHUNK_SIZE {
            assert_eq!(f.next_frame().unwrap(), Frame::Idle);
        }
        assert_eq!(f.next_frame().unwrap(), Frame::Line("a".repeat(MAX_LINE_LEN - 1)));
        assert_eq!(f.next_frame().unwrap(), Frame::Line("ébc".into()));
    }

    #[test]
    fn test_flush_point() {
        assert_eq!(flush_point(b"abc"), 3);
        assert_eq!(flush_point("abé".as_bytes()), 4);
        assert_eq!(flush_point(&[b'a', 0xE2, 0x82]), 1);
        assert_eq!(flush_point(&[b'a', 0xFF]), 2);
        assert_eq!(flush_point(&[0xC3]), 1);
    }
}
