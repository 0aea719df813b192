//! Where console frames and notices end up.

use crate::ops::ui::{error_line, info_line, success_line, warning_line};
use rustyline::ExternalPrinter;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Success,
    Error,
    Warning,
    Info,
}

impl Notice {
    fn line(self, msg: &str) -> String {
        match self {
            Notice::Success => success_line(msg),
            Notice::Error => error_line(msg),
            Notice::Warning => warning_line(msg),
            Notice::Info => info_line(msg),
        }
    }
}

/// Output sink shared by the command loop and the polling tasks.
pub trait Screen: Send + Sync {
    /// Replace what the user is looking at with `frame`.
    fn paint(&self, frame: &str);
    fn notify(&self, notice: Notice, msg: &str);
}

type Printer = Box<dyn ExternalPrinter + Send>;

/// Terminal output. While the prompt is waiting for input, text goes through
/// rustyline's external printer so the line being edited is redrawn.
#[derive(Default)]
pub struct TerminalScreen {
    printer: Mutex<Option<Printer>>,
    reading: AtomicBool,
}

impl TerminalScreen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach_printer(&self, printer: Printer) {
        if let Ok(mut slot) = self.printer.lock() {
            *slot = Some(printer);
        }
    }

    /// Mark whether the prompt currently owns the terminal.
    pub fn set_reading(&self, reading: bool) {
        self.reading.store(reading, Ordering::SeqCst);
    }

    fn emit(&self, text: String) {
        if self.reading.load(Ordering::SeqCst) {
            if let Ok(mut slot) = self.printer.lock() {
                if let Some(printer) = slot.as_mut() {
                    if printer.print(text.clone()).is_ok() {
                        return;
                    }
                }
            }
        }
        println!("{}", text);
    }
}

impl Screen for TerminalScreen {
    fn paint(&self, frame: &str) {
        self.emit(format!("\n{}", frame.trim_end()));
    }

    fn notify(&self, notice: Notice, msg: &str) {
        self.emit(notice.line(msg));
    }
}

/// Keeps everything in memory for assertions.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingScreen {
    pub frames: Mutex<Vec<String>>,
    pub notices: Mutex<Vec<(Notice, String)>>,
}

#[cfg(test)]
impl RecordingScreen {
    pub fn last_frame(&self) -> Option<String> {
        self.frames.lock().unwrap().last().cloned()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.lock().unwrap().len()
    }

    pub fn has_notice(&self, notice: Notice, needle: &str) -> bool {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .any(|(n, m)| *n == notice && m.contains(needle))
    }
}

#[cfg(test)]
impl Screen for RecordingScreen {
    fn paint(&self, frame: &str) {
        self.frames.lock().unwrap().push(frame.to_string());
    }

    fn notify(&self, notice: Notice, msg: &str) {
        self.notices.lock().unwrap().push((notice, msg.to_string()));
    }
}
