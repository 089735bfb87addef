/// Accumulates the DATA payload until the terminating `.` line.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DataCollector {
    data: Vec<u8>,
}

impl DataCollector {
    /// Feed one line, terminator included.
    ///
    /// Returns `true` once the end-of-data line has been seen; that line is
    /// not part of the payload. Other lines are kept byte for byte, except
    /// that a leading `..` is unstuffed to `.`, so the collected payload (and
    /// the record's `raw_source`) is the unstuffed text.
    pub fn push(&mut self, line: &[u8]) -> bool {
        if line.trim_ascii() == b"." {
            return true;
        }

        let line = match line {
            [b'.', b'.', ..] => &line[1..],
            _ => line,
        };
        self.data.extend_from_slice(line);

        false
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}
