use serde::Deserialize;
use std::collections::VecDeque;
use std::io;

/// Something that delivers newline separated text, usually the serial port.
pub trait LineSource {
    /// Number of bytes that can be read without waiting. Zero means "nothing to do yet".
    fn bytes_available(&mut self) -> io::Result<usize>;

    /// Read one line without its terminator.
    ///
    /// Waits at most the source's read timeout and returns `None` if no complete
    /// line arrived in that time. A partial line is kept for the next call.
    fn read_line(&mut self) -> io::Result<Option<String>>;

    /// Drop everything received so far, e.g. the boot messages of the peer.
    fn discard_input(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: LineSource + ?Sized> LineSource for Box<S> {
    fn bytes_available(&mut self) -> io::Result<usize> {
        (**self).bytes_available()
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        (**self).read_line()
    }

    fn discard_input(&mut self) -> io::Result<()> {
        (**self).discard_input()
    }
}

/// Assembles received bytes into lines.
#[derive(Clone, Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// A line that grows longer than this without a newline is handed out in pieces of this size.
    pub const MAX_LINE_LEN: usize = 4096;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// True if [`LineBuffer::take_line`] would return a line.
    pub fn has_line(&self) -> bool {
        self.pending.contains(&b'\n') || self.pending.len() > Self::MAX_LINE_LEN
    }

    /// Take the oldest complete line, decoded lossily as UTF-8, without the `\n`.
    pub fn take_line(&mut self) -> Option<String> {
        let end = match self.pending.iter().position(|&b| b == b'\n') {
            Some(newline) => newline,
            None if self.pending.len() > Self::MAX_LINE_LEN => Self::MAX_LINE_LEN,
            None => return None,
        };

        let rest = self.pending.split_off(end);
        let line = std::mem::replace(&mut self.pending, rest);
        if self.pending.first() == Some(&b'\n') {
            self.pending.remove(0);
        }

        Some(String::from_utf8_lossy(&line).into_owned())
    }
}

/// Replays a fixed list of lines, optionally forever.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct DummyLineSource {
    lines: VecDeque<String>,
    #[serde(default)]
    repeat: bool,
}

impl DummyLineSource {
    /// The canned demo data.
    pub fn new() -> Result<Self, serde_json::Error> {
        let json_data = std::include_str!("./dummysamples.json");

        serde_json::from_str::<Self>(json_data)
    }

    pub fn from_lines<I, L>(lines: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            repeat: false,
        }
    }

    pub fn remaining(&self) -> usize {
        self.lines.len()
    }
}

impl LineSource for DummyLineSource {
    fn bytes_available(&mut self) -> io::Result<usize> {
        Ok(self.lines.front().map_or(0, |line| line.len() + 1))
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        let line = self.lines.pop_front();
        if self.repeat {
            if let Some(line) = &line {
                self.lines.push_back(line.clone());
            }
        }
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_buffer_splits_on_newline() {
        let mut buffer = LineBuffer::new();
        buffer.extend(b"22.0,55.0\r\n22.5,");
        assert!(buffer.has_line());
        assert_eq!(buffer.take_line().as_deref(), Some("22.0,55.0\r"));

        assert!(!buffer.has_line());
        assert_eq!(buffer.take_line(), None);
        assert_eq!(buffer.len(), 5);

        buffer.extend(b"54.0\n");
        assert_eq!(buffer.take_line().as_deref(), Some("22.5,54.0"));
        assert!(buffer.is_empty());
    }

    #[test]
    fn line_buffer_decodes_lossily() {
        let mut buffer = LineBuffer::new();
        buffer.extend(&[0xff, b'1', b',', b'2', b'\n']);
        assert_eq!(buffer.take_line().as_deref(), Some("\u{fffd}1,2"));
    }

    #[test]
    fn line_buffer_hands_out_overlong_lines() {
        let mut buffer = LineBuffer::new();
        buffer.extend(&vec![b'x'; LineBuffer::MAX_LINE_LEN + 3]);
        assert!(buffer.has_line());
        assert_eq!(buffer.take_line().unwrap().len(), LineBuffer::MAX_LINE_LEN);
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn line_buffer_waits_for_newline_at_max_length() {
        let mut buffer = LineBuffer::new();
        buffer.extend(&vec![b'7'; LineBuffer::MAX_LINE_LEN]);
        assert!(!buffer.has_line());
        assert_eq!(buffer.take_line(), None);

        buffer.extend(b"\n");
        assert_eq!(buffer.take_line().unwrap().len(), LineBuffer::MAX_LINE_LEN);
        assert!(buffer.is_empty());
        assert!(!buffer.has_line());
    }

    #[test]
    fn dummy_source_replays_lines() {
        let mut source = DummyLineSource::from_lines(["22.0,55.0", "bad-line"]);
        assert_eq!(source.bytes_available().unwrap(), 10);
        assert_eq!(source.read_line().unwrap().as_deref(), Some("22.0,55.0"));
        assert_eq!(source.read_line().unwrap().as_deref(), Some("bad-line"));
        assert_eq!(source.bytes_available().unwrap(), 0);
        assert_eq!(source.read_line().unwrap(), None);
    }

    #[test]
    fn canned_demo_data_repeats() {
        let mut source = DummyLineSource::new().unwrap();
        let count = source.remaining();
        assert!(count > 0);

        for _ in 0..count * 2 {
            assert!(source.read_line().unwrap().is_some());
        }
        assert_eq!(source.remaining(), count);
    }
}
