//! Scripted modem line for unit tests

use crate::core::transport::{LineTransport, TransportError};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

/// Fake line answering writes from per-command reply queues.
///
/// Each write is looked up by its text without trailing CR/LF; the next queued
/// reply for that text (or the default reply) becomes readable, one chunk per
/// read call.
#[derive(Debug, Default)]
pub struct ScriptedLine {
    readable: VecDeque<Vec<u8>>,
    replies: HashMap<String, VecDeque<Vec<Vec<u8>>>>,
    default_reply: Vec<Vec<u8>>,
    fail_reads: bool,
    fail_reads_after_write: bool,
    writes: Vec<Vec<u8>>,
    flushes: usize,
}

impl ScriptedLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes already queued before the first write
    pub fn pending(mut self, data: &str) -> Self {
        self.readable.push_back(data.as_bytes().to_vec());
        self
    }

    /// Reply used for every write with no queued reply of its own
    pub fn respond(mut self, chunks: &[&str]) -> Self {
        self.default_reply = to_chunks(chunks);
        self
    }

    /// Queue a reply for the next write of `command`
    pub fn on(mut self, command: &str, chunks: &[&str]) -> Self {
        self.replies
            .entry(command.to_string())
            .or_default()
            .push_back(to_chunks(chunks));
        self
    }

    pub fn fail_reads_after_write(mut self) -> Self {
        self.fail_reads_after_write = true;
        self
    }

    /// Every write, as text
    pub fn written_lines(&self) -> Vec<String> {
        self.writes
            .iter()
            .map(|w| String::from_utf8_lossy(w).into_owned())
            .collect()
    }

    /// Written commands without their line terminators
    pub fn commands(&self) -> Vec<String> {
        self.written_lines()
            .iter()
            .map(|w| w.trim_end_matches(['\r', '\n']).to_string())
            .collect()
    }

    pub fn flushes(&self) -> usize {
        self.flushes
    }

    pub fn pending_len(&self) -> usize {
        self.readable.iter().map(Vec::len).sum()
    }
}

fn to_chunks(chunks: &[&str]) -> Vec<Vec<u8>> {
    chunks.iter().map(|c| c.as_bytes().to_vec()).collect()
}

impl LineTransport for ScriptedLine {
    fn read_with_deadline(&mut self, buf: &mut [u8], _deadline: Duration) -> Result<usize, TransportError> {
        if self.fail_reads {
            return Err(TransportError::IoError(std::io::Error::other("line gone")));
        }
        let Some(front) = self.readable.front_mut() else {
            return Ok(0);
        };
        let n = front.len().min(buf.len());
        buf[..n].copy_from_slice(&front[..n]);
        front.drain(..n);
        if front.is_empty() {
            self.readable.pop_front();
        }
        Ok(n)
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.writes.push(data.to_vec());
        if self.fail_reads_after_write {
            self.fail_reads = true;
        }

        let key = String::from_utf8_lossy(data)
            .trim_end_matches(['\r', '\n'])
            .to_string();
        let reply = self
            .replies
            .get_mut(&key)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| self.default_reply.clone());
        self.readable.extend(reply);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        self.flushes += 1;
        Ok(())
    }
}
