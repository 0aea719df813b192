//! Interactive console with live polling.

mod controller;
mod screen;
mod shell;

pub use shell::console_loop;
