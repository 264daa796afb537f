use std::io::Write;
use crate::cache::{AccessKind, AccessSink};
use crate::error::{Result, SimulationError};

pub const LINE_SIZE: usize = 40;
const SEQUENCE_UPPER: usize = 16;
const ADDRESS_OFFSET: usize = SEQUENCE_UPPER + 1;
const ADDRESS_SIZE: usize = 16;
const ADDRESS_UPPER: usize = ADDRESS_OFFSET + ADDRESS_SIZE;
const RW_MODE: usize = ADDRESS_UPPER + 1;
const SIZE: usize = RW_MODE + 2;
const MAX_SIZE: u64 = 999;

/// A single memory access, as stored in a trace file
///
/// Each record is one fixed width line: a hexadecimal sequence number, a hexadecimal address, `R`
/// or `W`, and a three digit decimal size, e.g.
///
/// ```text
/// 0000000000000003 0000000000002000 W 002
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TraceRecord {
    pub address: u64,
    pub size: u64,
    pub kind: AccessKind,
}

impl TraceRecord {
    /// Writes the record as a single 40 byte line
    ///
    /// # Arguments
    ///
    /// * `sequence`: The position of the access in the trace, starting from 0
    /// * `out`: Where to write the line
    ///
    /// returns: Result<(), SimulationError>
    pub fn write_line<W: Write + ?Sized>(&self, sequence: u64, out: &mut W) -> Result<()> {
        if self.size > MAX_SIZE {
            return Err(SimulationError::InvalidProgram(format!(
                "access {sequence} has size {}, which doesn't fit the three digit size field of a trace line", self.size
            )));
        }
        writeln!(out, "{sequence:016x} {:016x} {} {:03}", self.address, self.kind.as_char(), self.size)?;
        Ok(())
    }

    /// Parses one line of a trace, including its trailing newline
    ///
    /// Unlike the writer, this checks every field, as traces may come from elsewhere
    ///
    /// # Arguments
    ///
    /// * `buffer`: The bytes of the line
    /// * `line`: The 1-based line number, used in errors
    ///
    /// returns: Result<TraceRecord, SimulationError>
    ///
    /// # Examples
    ///
    /// ```
    /// use tracelib::cache::AccessKind;
    /// use tracelib::trace::TraceRecord;
    /// let record = TraceRecord::parse_line(b"0000000000000000 000000000000000A R 008\n", 1).unwrap();
    /// assert_eq!(record, TraceRecord { address: 10, size: 8, kind: AccessKind::Read });
    /// ```
    pub fn parse_line(buffer: &[u8], line: usize) -> Result<Self> {
        let malformed = |reason: &str| SimulationError::MalformedTrace { line, reason: reason.to_string() };
        if buffer.len() != LINE_SIZE || buffer[LINE_SIZE - 1] != b'\n' {
            return Err(malformed("expected a 40 byte line"));
        }
        if [SEQUENCE_UPPER, ADDRESS_UPPER, RW_MODE + 1].iter().any(|&separator| buffer[separator] != b' ') {
            return Err(malformed("fields must be separated by single spaces"));
        }
        let is_hex = |field: &[u8]| field.iter().all(u8::is_ascii_hexdigit);
        if !is_hex(&buffer[..SEQUENCE_UPPER]) {
            return Err(malformed("the sequence number is not hexadecimal"));
        }
        let address = std::str::from_utf8(&buffer[ADDRESS_OFFSET..ADDRESS_UPPER]).ok()
            .filter(|text| is_hex(text.as_bytes()))
            .and_then(|text| u64::from_str_radix(text, 16).ok())
            .ok_or_else(|| malformed("the address is not hexadecimal"))?;
        let kind = std::str::from_utf8(&buffer[RW_MODE..RW_MODE + 1])
            .map_err(|_| malformed("the access kind is not text"))?
            .parse::<AccessKind>()?;
        let size = std::str::from_utf8(&buffer[SIZE..LINE_SIZE - 1]).ok()
            .filter(|text| text.bytes().all(|c| c.is_ascii_digit()))
            .and_then(|text| text.parse::<u64>().ok())
            .ok_or_else(|| malformed("the size is not a three digit decimal"))?;
        Ok(Self { address, size, kind })
    }
}

/// Collects accesses without simulating them, e.g. to inspect the order a program generates them in
impl AccessSink for Vec<TraceRecord> {
    fn access(&mut self, address: u64, size: u64, kind: AccessKind) -> Result<bool> {
        self.push(TraceRecord { address, size, kind });
        Ok(false)
    }
}

/// Writes every access to a trace before passing it on to another sink
pub struct TraceWriter<S, W> {
    inner: S,
    out: W,
    sequence: u64,
}

impl<S: AccessSink, W: Write> TraceWriter<S, W> {
    pub fn new(inner: S, out: W) -> Self {
        Self { inner, out, sequence: 0 }
    }

    /// The number of lines written so far
    pub fn written(&self) -> u64 {
        self.sequence
    }

    pub fn into_inner(self) -> (S, W) {
        (self.inner, self.out)
    }
}

impl<S: AccessSink, W: Write> AccessSink for TraceWriter<S, W> {
    fn access(&mut self, address: u64, size: u64, kind: AccessKind) -> Result<bool> {
        TraceRecord { address, size, kind }.write_line(self.sequence, &mut self.out)?;
        self.sequence += 1;
        self.inner.access(address, size, kind)
    }
}

/// Feeds every access of a trace to a sink, in order
///
/// Reads from the byte array are sequential, so a memory mapped file can be advised accordingly.
/// The whole length is checked up front, but lines are only validated as they are reached, so
/// accesses before a malformed line have already been performed when the error is returned
///
/// # Arguments
///
/// * `bytes`: The trace, a whole number of 40 byte lines
/// * `sink`: Where the accesses go
///
/// returns: Result<u64, SimulationError>, the number of accesses replayed
pub fn replay<S: AccessSink + ?Sized>(bytes: &[u8], sink: &mut S) -> Result<u64> {
    if bytes.len() % LINE_SIZE != 0 {
        return Err(SimulationError::MalformedTrace {
            line: bytes.len() / LINE_SIZE + 1,
            reason: "the trace ends with a partial line".to_string(),
        });
    }
    let mut count = 0;
    for (index, buffer) in bytes.chunks_exact(LINE_SIZE).enumerate() {
        let record = TraceRecord::parse_line(buffer, index + 1)?;
        sink.access(record.address, record.size, record.kind)?;
        count += 1;
    }
    Ok(count)
}
