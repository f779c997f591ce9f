//! Scripted serial port double for exercising protocol logic without
//! hardware.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::time::Duration;

use crate::error::Result;
use crate::port::Port;

/// Test double: reads are served from a scripted queue and behave like a
/// quiet device (timeout) once it drains; writes are recorded.
#[derive(Debug)]
pub(crate) struct MockPort {
    pub(crate) read_buf: VecDeque<u8>,
    pub(crate) write_buf: Vec<u8>,
    /// Length of each individual write call, in order. Lets tests assert
    /// chunk boundaries, not just the flattened byte stream.
    pub(crate) write_lens: Vec<usize>,
    pub(crate) close_calls: usize,
    pub(crate) clear_calls: usize,
    /// When set, writes fail with a timed-out I/O error.
    pub(crate) stall_writes: bool,
    closed: bool,
    timeout: Duration,
}

impl MockPort {
    pub(crate) fn new(script: &[u8]) -> Self {
        Self {
            read_buf: script.iter().copied().collect(),
            write_buf: Vec::new(),
            write_lens: Vec::new(),
            close_calls: 0,
            clear_calls: 0,
            stall_writes: false,
            closed: false,
            timeout: Duration::from_secs(2),
        }
    }

    /// Queue device replies in the order the protocol will consume them.
    pub(crate) fn scripted(replies: &[&[u8]]) -> Self {
        let mut script = Vec::new();
        for reply in replies {
            script.extend_from_slice(reply);
        }
        Self::new(&script)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Read for MockPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.closed {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "port closed"));
        }
        if self.read_buf.is_empty() {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "no data"));
        }
        let n = buf.len().min(self.read_buf.len());
        for slot in buf.iter_mut().take(n) {
            *slot = self.read_buf.pop_front().unwrap();
        }
        Ok(n)
    }
}

impl Write for MockPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.closed {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "port closed"));
        }
        if self.stall_writes {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "write stalled"));
        }
        self.write_buf.extend_from_slice(buf);
        self.write_lens.push(buf.len());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Port for MockPort {
    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.timeout = timeout;
        Ok(())
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn clear_buffers(&mut self) -> Result<()> {
        self.clear_calls += 1;
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn close(&mut self) -> Result<()> {
        self.close_calls += 1;
        self.closed = true;
        Ok(())
    }
}
