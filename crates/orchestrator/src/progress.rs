//! Progress indicator

use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::terminal::Terminal;

const FRAMES: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// Delay between two animation frames.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Default)]
struct SpinnerState {
    pos: usize,
    last_frame: Option<usize>,
    active: bool,
    cancel: Option<CancellationToken>,
}

impl SpinnerState {
    fn next(&mut self) -> char {
        let glyph = FRAMES[self.pos % FRAMES.len()];
        self.last_frame = Some(self.pos);
        self.pos = self.pos.wrapping_add(1);
        glyph
    }

    /// Erase the glyph drawn last, plus the space after it.
    fn erase(&self, out: &mut dyn Write) {
        if self.last_frame.is_none() {
            return;
        }
        let n = 2;
        for seq in ["\u{8}", " ", "\u{8}"] {
            for _ in 0..n {
                let _ = out.write_all(seq.as_bytes());
            }
        }
    }
}

/// Rotating glyph drawn while work is outstanding.
pub struct Spinner {
    state: Arc<Mutex<SpinnerState>>,
    terminal: Terminal,
}

impl Spinner {
    pub fn new(terminal: Terminal) -> Self {
        Self {
            state: Arc::new(Mutex::new(SpinnerState::default())),
            terminal,
        }
    }

    /// Start animating. Does nothing if already running or if there is no
    /// tokio runtime to drive the animation.
    pub fn start(&self) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => return,
        };

        let mut state = self.state.lock();
        if state.active {
            return;
        }
        state.active = true;
        state.last_frame = None;
        state.pos = 0;
        let token = CancellationToken::new();
        state.cancel = Some(token.clone());
        drop(state);

        let shared = self.state.clone();
        let terminal = self.terminal.clone();
        handle.spawn(async move {
            loop {
                {
                    // stop() erases under the state lock, so checking the
                    // token here keeps a frame from being drawn after it
                    let mut state = shared.lock();
                    if token.is_cancelled() {
                        break;
                    }
                    let mut out = terminal.lock();
                    state.erase(&mut **out);
                    let glyph = state.next();
                    let _ = write!(out, "\r{} ", glyph);
                    let _ = out.flush();
                }
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(FRAME_INTERVAL) => {}
                }
            }
            trace!("spinner stopped");
        });
    }

    /// Stop animating and erase the glyph. Safe to call when not running.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        if !state.active {
            return;
        }
        state.active = false;
        {
            let mut out = self.terminal.lock();
            state.erase(&mut **out);
            let _ = out.flush();
        }
        state.last_frame = None;
        if let Some(token) = state.cancel.take() {
            token.cancel();
        }
    }

    /// Advance one frame and return its glyph without drawing it.
    pub fn step(&self) -> char {
        self.state.lock().next()
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().active
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if let Some(token) = self.state.lock().cancel.take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SharedBuffer;

    #[test]
    fn stop_without_start_is_safe() {
        let buf = SharedBuffer::default();
        let spinner = Spinner::new(Terminal::from_writer(buf.clone()));
        spinner.stop();
        assert!(!spinner.is_active());
        assert_eq!(buf.len(), 0);
    }

    #[test]
    fn step_cycles_frames() {
        let spinner = Spinner::new(Terminal::from_writer(SharedBuffer::default()));
        let glyphs: Vec<char> = (0..FRAMES.len() + 1).map(|_| spinner.step()).collect();
        assert_eq!(glyphs[0], '⠋');
        assert_eq!(glyphs[9], '⠏');
        assert_eq!(glyphs[10], '⠋');
    }

    #[tokio::test]
    async fn start_draws_and_stop_erases() {
        let buf = SharedBuffer::default();
        let spinner = Spinner::new(Terminal::from_writer(buf.clone()));
        spinner.start();
        spinner.start();
        assert!(spinner.is_active());

        tokio::time::sleep(FRAME_INTERVAL * 2 + Duration::from_millis(50)).await;
        spinner.stop();
        assert!(!spinner.is_active());

        let out = buf.contents();
        assert!(out.starts_with("\r⠋ "), "{:?}", out);
        assert!(out.contains("\r⠙ "), "{:?}", out);
        assert!(out.ends_with("\u{8}\u{8}  \u{8}\u{8}"), "{:?}", out);

        // no frames after stop
        let len = buf.len();
        tokio::time::sleep(FRAME_INTERVAL * 2).await;
        assert_eq!(buf.len(), len);
    }

    #[test]
    fn start_without_runtime_is_noop() {
        let buf = SharedBuffer::default();
        let spinner = Spinner::new(Terminal::from_writer(buf.clone()));
        spinner.start();
        assert!(!spinner.is_active());
        assert_eq!(buf.len(), 0);
    }
}
