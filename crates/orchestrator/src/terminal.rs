//! Shared terminal output

use parking_lot::{Mutex, MutexGuard};
use std::io::{self, Write};
use std::sync::Arc;

const FALLBACK_SIZE: (usize, usize) = (80, 24);

type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// Handle to the output stream shared by the spinner and the formatter.
///
/// All writes go through one lock so a spinner frame can never land in the
/// middle of a rendered frame.
#[derive(Clone)]
pub struct Terminal {
    writer: SharedWriter,
    size: Option<(usize, usize)>,
}

impl Terminal {
    pub fn stdout() -> Self {
        Self::from_writer(io::stdout())
    }

    pub fn from_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Arc::new(Mutex::new(Box::new(writer))),
            size: None,
        }
    }

    /// Pin the reported size instead of querying the tty.
    pub fn with_size(mut self, cols: usize, rows: usize) -> Self {
        self.size = Some((cols, rows));
        self
    }

    /// Terminal `(columns, rows)`, falling back to 80x24 when unknown.
    pub fn size(&self) -> (usize, usize) {
        if let Some(size) = self.size {
            return size;
        }
        match crossterm::terminal::size() {
            Ok((cols, rows)) if cols > 0 && rows > 0 => (cols as usize, rows as usize),
            _ => FALLBACK_SIZE,
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, Box<dyn Write + Send>> {
        self.writer.lock()
    }
}

impl std::fmt::Debug for Terminal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Terminal").field("size", &self.size).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SharedBuffer;

    #[test]
    fn pinned_size_wins() {
        let term = Terminal::from_writer(SharedBuffer::default()).with_size(120, 40);
        assert_eq!(term.size(), (120, 40));
    }

    #[test]
    fn writes_reach_the_writer() {
        let buf = SharedBuffer::default();
        let term = Terminal::from_writer(buf.clone());
        write!(term.lock(), "hello").unwrap();
        assert_eq!(buf.contents(), "hello");
    }
}
