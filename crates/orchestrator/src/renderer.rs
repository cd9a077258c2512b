//! Rendering of run snapshots
//!
//! Two presentations are supported:
//! - snapshot mode ([`print_output`]) redraws the whole result set in place
//!   on every tick, with a progress line while the test is running
//! - streaming mode ([`StreamRenderer`]) appends each node's result once,
//!   as soon as it is final

use crossterm::cursor::MoveUp;
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};
use parking_lot::Mutex;
use perfops_common::{PerfOpsResult, RunOutput, RunResult, NO_DATA};
use serde::Serialize;
use std::collections::HashSet;
use std::io::{self, Write};

use crate::progress::Spinner;
use crate::terminal::Terminal;

/// Text shown under a node header, or `None` for results that have
/// nothing to show yet.
fn item_text(result: &RunResult) -> Option<String> {
    if result.message.is_empty() {
        Some(result.display_output())
    } else if result.message != NO_DATA {
        Some(result.message.clone())
    } else {
        None
    }
}

/// Buffers one frame of output and draws it over the previous frame.
pub struct Formatter {
    print_id: bool,
    spinner: Spinner,
    terminal: Terminal,
    buf: Mutex<String>,
    previous_lines: Mutex<usize>,
}

impl Formatter {
    pub fn new(terminal: Terminal, print_id: bool) -> Self {
        Self {
            print_id,
            spinner: Spinner::new(terminal.clone()),
            terminal,
            buf: Mutex::new(String::new()),
            previous_lines: Mutex::new(0),
        }
    }

    pub fn print_id(&self) -> bool {
        self.print_id
    }

    pub fn spinner(&self) -> &Spinner {
        &self.spinner
    }

    pub fn start_spinner(&self) {
        self.spinner.start();
    }

    pub fn stop_spinner(&self) {
        self.spinner.stop();
    }

    /// Append text to the pending frame.
    pub fn print<S: AsRef<str>>(&self, text: S) {
        self.buf.lock().push_str(text.as_ref());
    }

    /// Draw the pending frame and reset the buffer.
    ///
    /// The lines of the previous frame are erased first and the cursor is
    /// sent to the start of the row. With `limit` set the frame is clipped
    /// to the terminal size.
    pub fn flush(&self, limit: bool) -> io::Result<()> {
        let (cols, rows) = self.terminal.size();

        let frame = {
            let mut buf = self.buf.lock();
            if buf.is_empty() {
                return Ok(());
            }
            std::mem::take(&mut *buf)
        };
        let frame = if limit { clip_frame(&frame, cols, rows) } else { frame };

        let mut previous = self.previous_lines.lock();
        let mut guard = self.terminal.lock();
        let out = &mut *guard;
        for _ in 0..*previous {
            queue!(out, MoveUp(1), Clear(ClearType::CurrentLine))?;
        }
        write!(out, "\x1b[{}D", cols)?;
        out.write_all(frame.as_bytes())?;
        out.flush()?;
        *previous = frame.matches('\n').count();
        Ok(())
    }
}

/// Clip `text` to `cols` columns and `rows` lines.
///
/// A character that would overflow the row is replaced by a line break.
/// Output stops once `rows` lines have been produced.
pub fn clip_frame(text: &str, cols: usize, rows: usize) -> String {
    let mut out = String::with_capacity(text.len());
    let mut width = 0;
    let mut lines = 0;
    for c in text.chars() {
        width += 1;
        if c == '\n' || width > cols {
            width = 0;
            lines += 1;
            if lines == rows {
                break;
            }
            out.push('\n');
        } else {
            out.push(c);
        }
    }
    out
}

/// Redraw the whole snapshot through the formatter.
pub fn print_output(f: &Formatter, output: &RunOutput) -> io::Result<()> {
    if f.print_id() {
        f.print(format!("Test ID: {}\n", output.id));
    }
    let glyph = f.spinner().step();
    let finished = output.is_finished();
    if !finished {
        f.print(glyph.to_string());
        if !output.items.is_empty() {
            f.print(format!(" {}/{}", output.finished_items(), output.items.len()));
        }
        f.print("\n");
    }
    for item in &output.items {
        if let Some(result) = &item.result {
            if let Some(text) = item_text(result) {
                f.print(format!("{}\n{}\n", result.node_header(), text));
            }
        }
        if !item.is_finished() {
            f.print(format!("{}\n", glyph));
        }
    }
    f.flush(!finished)
}

/// Prints each item once, the first time it has something to show.
///
/// Items still reporting `NO DATA` are left out of the printed set so they
/// are picked up by a later snapshot.
#[derive(Debug, Default)]
pub struct StreamRenderer {
    printed: HashSet<String>,
}

impl StreamRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_printed(&self, id: &str) -> bool {
        self.printed.contains(id)
    }

    pub fn printed_count(&self) -> usize {
        self.printed.len()
    }

    /// Whether `output` holds an item that [`render`](Self::render) would print.
    pub fn has_new(&self, output: &RunOutput) -> bool {
        output.items.iter().any(|item| {
            !self.printed.contains(&item.id)
                && item.result.as_ref().and_then(item_text).is_some()
        })
    }

    /// Print the items of `output` not shown before.
    pub fn render<W: Write + ?Sized>(&mut self, w: &mut W, output: &RunOutput) -> io::Result<()> {
        for item in &output.items {
            if self.printed.contains(&item.id) {
                continue;
            }
            let Some(result) = &item.result else {
                continue;
            };
            if let Some(text) = item_text(result) {
                self.printed.insert(item.id.clone());
                write!(w, "{}\n{}\n", result.node_header(), text)?;
            }
        }
        w.flush()
    }
}

/// Print `value` as one line of compact JSON.
pub fn print_output_json<W: Write + ?Sized, T: Serialize>(w: &mut W, value: &T) -> PerfOpsResult<()> {
    let json = serde_json::to_string(value)?;
    writeln!(w, "{}", json)?;
    w.flush()?;
    Ok(())
}
