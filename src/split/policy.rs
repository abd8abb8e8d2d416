use bytes::Bytes;

/// Result of asking a [`SplitPolicy`] to carve the next record out of buffered input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Split {
    /// Consume `advance` bytes and emit `record`.
    Record { advance: usize, record: Bytes },
    /// Consume `advance` bytes without emitting a record.
    Skip { advance: usize },
    /// More input is required. At end of input this ends the stream.
    NeedMore,
}

/// Partitions a raw byte stream into discrete records.
///
/// `data` holds every buffered byte that has not been consumed yet and `at_eof` reports
/// whether the underlying reader is exhausted. Implementations must consume at least one
/// byte whenever they return [`Split::Record`] or [`Split::Skip`].
pub trait SplitPolicy: Send + Sync + 'static {
    fn split(&self, data: &[u8], at_eof: bool) -> Split;
}

impl<F> SplitPolicy for F
where
    F: Fn(&[u8], bool) -> Split + Send + Sync + 'static,
{
    fn split(&self, data: &[u8], at_eof: bool) -> Split {
        self(data, at_eof)
    }
}

/// Splits on `\n`, dropping a trailing `\r` from every line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Lines;

impl SplitPolicy for Lines {
    fn split(&self, data: &[u8], at_eof: bool) -> Split {
        if at_eof && data.is_empty() {
            return Split::NeedMore;
        }

        if let Some(index) = data.iter().position(|&byte| byte == b'\n') {
            return Split::Record {
                advance: index + 1,
                record: record_without_cr(&data[..index]),
            };
        }

        if at_eof {
            return Split::Record {
                advance: data.len(),
                record: record_without_cr(data),
            };
        }

        Split::NeedMore
    }
}

/// Groups a fixed number of lines into a single record.
///
/// Lines inside a record keep their `\n` separators. The final, possibly partial, group is
/// returned at end of input. A non-positive line count never completes a group, so the whole
/// input becomes one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultiLines {
    line_count: i64,
}

impl MultiLines {
    pub fn new(line_count: i64) -> Self {
        Self { line_count }
    }

    pub fn line_count(&self) -> i64 {
        self.line_count
    }

    fn group_end(&self, data: &[u8]) -> Option<usize> {
        if self.line_count <= 0 {
            return None;
        }

        let mut seen = 0i64;
        data.iter().position(|&byte| {
            if byte == b'\n' {
                seen += 1;
            }
            seen == self.line_count
        })
    }
}

impl SplitPolicy for MultiLines {
    fn split(&self, data: &[u8], at_eof: bool) -> Split {
        if at_eof && data.is_empty() {
            return Split::NeedMore;
        }

        if let Some(index) = self.group_end(data) {
            return Split::Record {
                advance: index + 1,
                record: record_without_cr(&data[..index]),
            };
        }

        if at_eof {
            return Split::Record {
                advance: data.len(),
                record: record_without_cr(data),
            };
        }

        Split::NeedMore
    }
}

fn record_without_cr(data: &[u8]) -> Bytes {
    let trimmed = match data.last() {
        Some(b'\r') => &data[..data.len() - 1],
        _ => data,
    };
    Bytes::copy_from_slice(trimmed)
}
