//! Clipboard writes through the terminal (OSC 52).

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::io::Write;

/// Escape sequence asking the terminal to place `text` on the clipboard.
pub fn osc52_sequence(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", STANDARD.encode(text))
}

/// Emit the sequence on stdout. Terminals without OSC 52 ignore it.
pub fn copy_to_clipboard(text: &str) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(osc52_sequence(text).as_bytes())?;
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_wraps_base64_payload() {
        assert_eq!(
            osc52_sequence("1.2.3.4:5678"),
            "\x1b]52;c;MS4yLjMuNDo1Njc4\x07"
        );
    }
}
