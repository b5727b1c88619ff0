//! Response accumulation and terminator classification

use bytes::BytesMut;
use std::fmt;

/// Size of the reception buffer for one response
pub const RESPONSE_CAPACITY: usize = 256;

/// Final result code that ended a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    /// `OK`
    Ok,
    /// `ERROR`
    Error,
}

/// Marker strings that end a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Markers {
    /// Final result code of a successful command
    pub success: &'static str,
    /// Final result code of a failed command
    pub failure: &'static str,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            success: "OK",
            failure: "ERROR",
        }
    }
}

/// A classified response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    /// Which marker ended the response
    pub terminator: Terminator,
    /// Text before the marker with surrounding CR/LF removed
    pub payload: String,
}

/// Scan `buf` for the earliest success or failure marker.
///
/// Returns `None` while neither marker is present.
pub fn classify(buf: &[u8], markers: &Markers) -> Option<Classified> {
    let ok = find(buf, markers.success.as_bytes());
    let error = find(buf, markers.failure.as_bytes());

    let (at, terminator) = match (ok, error) {
        (Some(o), Some(e)) if e < o => (e, Terminator::Error),
        (Some(o), _) => (o, Terminator::Ok),
        (None, Some(e)) => (e, Terminator::Error),
        (None, None) => return None,
    };

    Some(Classified {
        terminator,
        payload: trim_crlf(&buf[..at]),
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn trim_crlf(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_matches(|c| c == '\r' || c == '\n')
        .to_string()
}

/// Response buffer is full and no marker was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exhausted {
    /// Size of the full buffer
    pub capacity: usize,
}

/// Bounded accumulator for one response
pub struct ResponseBuffer {
    data: BytesMut,
    capacity: usize,
    markers: Markers,
}

impl ResponseBuffer {
    /// Empty buffer holding at most `capacity` bytes
    pub fn new(capacity: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(capacity),
            capacity,
            markers: Markers::default(),
        }
    }

    /// Bytes still accepted before the buffer is exhausted
    pub fn remaining(&self) -> usize {
        self.capacity - self.data.len()
    }

    /// Bytes accumulated so far
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Nothing accumulated yet
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append a chunk and rescan everything accumulated so far.
    ///
    /// Bytes beyond the capacity are dropped. Once the buffer is full
    /// without a marker, `Err(Exhausted)` is returned.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Option<Classified>, Exhausted> {
        let take = chunk.len().min(self.remaining());
        self.data.extend_from_slice(&chunk[..take]);

        match classify(&self.data, &self.markers) {
            Some(found) => Ok(Some(found)),
            None if self.remaining() == 0 => Err(Exhausted {
                capacity: self.capacity,
            }),
            None => Ok(None),
        }
    }

    /// Raw content, for diagnostics
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Debug for ResponseBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseBuffer")
            .field("data", &String::from_utf8_lossy(&self.data))
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_ok_with_payload() {
        let found = classify(b"\r\nSIMCOM_SIM900\r\n\r\nOK\r\n", &Markers::default()).unwrap();
        assert_eq!(found.terminator, Terminator::Ok);
        assert_eq!(found.payload, "SIMCOM_SIM900");
    }

    #[test]
    fn test_classify_earliest_marker_wins() {
        let found = classify(b"abcOKxyz\r\nERRORxyz", &Markers::default()).unwrap();
        assert_eq!(found.terminator, Terminator::Ok);
        assert_eq!(found.payload, "abc");

        let found = classify(b"\r\nERROR\r\nlate OK", &Markers::default()).unwrap();
        assert_eq!(found.terminator, Terminator::Error);
        assert_eq!(found.payload, "");
    }

    #[test]
    fn test_classify_keeps_interior_line_breaks() {
        let found = classify(b"\r\nline1\r\nline2\r\n\r\nOK", &Markers::default()).unwrap();
        assert_eq!(found.payload, "line1\r\nline2");
    }

    #[test]
    fn test_classify_no_marker() {
        assert_eq!(classify(b"\r\n+CPIN: READY\r\n", &Markers::default()), None);
        assert_eq!(classify(b"", &Markers::default()), None);
        assert_eq!(classify(b"O", &Markers::default()), None);
    }

    #[test]
    fn test_marker_split_across_chunks() {
        let mut split = ResponseBuffer::new(RESPONSE_CAPACITY);
        assert_eq!(split.push(b"\r\nO").unwrap(), None);
        let split = split.push(b"K\r\n").unwrap();

        let mut whole = ResponseBuffer::new(RESPONSE_CAPACITY);
        let whole = whole.push(b"\r\nOK\r\n").unwrap();

        assert_eq!(split, whole);
        assert_eq!(split.unwrap().terminator, Terminator::Ok);
    }

    #[test]
    fn test_error_split_across_chunks() {
        let mut buf = ResponseBuffer::new(RESPONSE_CAPACITY);
        assert_eq!(buf.push(b"ER").unwrap(), None);
        assert_eq!(buf.push(b"RO").unwrap(), None);
        let found = buf.push(b"R\r\n").unwrap().unwrap();
        assert_eq!(found.terminator, Terminator::Error);
    }

    #[test]
    fn test_buffer_exhausted() {
        let mut buf = ResponseBuffer::new(8);
        assert_eq!(buf.push(b"12345").unwrap(), None);
        assert_eq!(buf.remaining(), 3);
        assert_eq!(buf.push(b"6789OK"), Err(Exhausted { capacity: 8 }));
        assert_eq!(buf.len(), 8);
    }

    #[test]
    fn test_marker_in_last_free_bytes() {
        let mut buf = ResponseBuffer::new(4);
        let found = buf.push(b"abOK").unwrap().unwrap();
        assert_eq!(found.payload, "ab");
    }
}
