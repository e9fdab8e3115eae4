/// Reads null-terminated strings out of a byte buffer.
///
/// The cursor rests on the delimiter that ended the previous read (initially
/// one before the start of the buffer). Each read first steps past it, then
/// collects bytes until a null byte or the end of the buffer, leaving the
/// cursor on the terminator, or one past the end if the buffer ran out.
///
/// An empty string therefore means one of two things: two nulls in a row, or
/// a read that started at the end of the buffer. [StringCursor::is_exhausted]
/// tells them apart.
#[derive(Debug, Clone)]
pub struct StringCursor<'a> {
    data: &'a [u8],
    /// Start of the next read, always one past the cursor.
    next: usize,
}

impl<'a> StringCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        StringCursor { data, next: 0 }
    }

    /// True once the cursor has moved past the last byte of the buffer.
    pub fn is_exhausted(&self) -> bool {
        self.next > self.data.len()
    }

    /// Get the next null-terminated string.
    ///
    /// Never reads past the buffer: once exhausted, every call returns an empty string.
    pub fn read_string(&mut self) -> String {
        let start: usize = self.next;
        let rest: &[u8] = match self.data.get(start..) {
            Some(rest) => rest,
            None => {
                self.next = start.saturating_add(1);
                return String::new();
            }
        };

        let len: usize = rest.iter().position(|&c| c == 0).unwrap_or(rest.len());
        self.next = start + len + 1;

        String::from_utf8_lossy(&rest[..len]).into_owned()
    }
}

/// Yields strings until the buffer is exhausted, empty ones included.
impl Iterator for StringCursor<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.is_exhausted() {
            return None;
        }
        Some(self.read_string())
    }
}
