//! Byte-level line discipline for the fake terminal.
//!
//! Interactive SSH clients send keystrokes, not lines. This turns the raw
//! channel bytes into edited, echoed lines the session loop can dispatch:
//! printable bytes accumulate and echo back, CR/LF (and CRLF as one)
//! complete a line, DEL/backspace erases, Ctrl-C discards the partial line,
//! Ctrl-D ends the input stream. ESC-led sequences are consumed rather than
//! leaked into the buffer; up and down arrows navigate the line history.

const BELL: u8 = 0x07;
const BACKSPACE: u8 = 0x08;
const CTRL_C: u8 = 0x03;
const CTRL_D: u8 = 0x04;
const DEL: u8 = 0x7f;
const ESC: u8 = 0x1b;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    /// A complete line, surrounding whitespace still attached
    Line(String),
    /// Ctrl-C: partial line discarded, caller should re-prompt
    Interrupt,
    /// Ctrl-D: the attacker is done
    EndOfInput,
}

#[derive(Debug, Default)]
pub struct Fed {
    /// Bytes to echo back to the attacker's terminal
    pub echo: Vec<u8>,
    pub events: Vec<LineEvent>,
}

/// Escape-sequence scanner state
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum EscState {
    #[default]
    Ground,
    /// ESC seen, waiting for the introducer
    Esc,
    /// ESC [ plus parameter bytes until a final byte 0x40..=0x7e
    Csi,
    /// ESC O, one final byte follows (application-mode cursor keys)
    Ss3,
}

/// Accumulates raw input bytes into lines, one instance per channel
#[derive(Debug, Default)]
pub struct LineDiscipline {
    buf: Vec<u8>,
    last_was_cr: bool,
    esc: EscState,
    history: Vec<String>,
    /// Index into `history`; equal to `history.len()` on a fresh line
    history_pos: usize,
}

impl LineDiscipline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, data: &[u8]) -> Fed {
        let mut fed = Fed::default();

        for &byte in data {
            // Swallow the LF of a CRLF pair
            if self.last_was_cr && byte == b'\n' {
                self.last_was_cr = false;
                continue;
            }
            self.last_was_cr = false;

            match self.esc {
                EscState::Esc => {
                    self.esc = match byte {
                        b'[' => EscState::Csi,
                        b'O' => EscState::Ss3,
                        // Unrecognized two-byte escape; swallow it
                        _ => EscState::Ground,
                    };
                    continue;
                }
                EscState::Csi => {
                    if (0x40..=0x7e).contains(&byte) {
                        self.esc = EscState::Ground;
                        self.navigate(byte, &mut fed);
                    }
                    continue;
                }
                EscState::Ss3 => {
                    self.esc = EscState::Ground;
                    self.navigate(byte, &mut fed);
                    continue;
                }
                EscState::Ground => {}
            }

            match byte {
                ESC => {
                    self.esc = EscState::Esc;
                }
                b'\r' | b'\n' => {
                    self.last_was_cr = byte == b'\r';
                    fed.echo.extend_from_slice(b"\r\n");
                    let line = String::from_utf8_lossy(&self.buf).into_owned();
                    self.buf.clear();
                    if !line.is_empty() {
                        self.history.push(line.clone());
                    }
                    self.history_pos = self.history.len();
                    fed.events.push(LineEvent::Line(line));
                }
                BACKSPACE | DEL => {
                    if self.buf.pop().is_some() {
                        fed.echo.extend_from_slice(b"\x08 \x08");
                    } else {
                        // Nothing to erase; ring the bell
                        fed.echo.push(BELL);
                    }
                }
                CTRL_C => {
                    self.buf.clear();
                    self.history_pos = self.history.len();
                    fed.echo.extend_from_slice(b"^C\r\n");
                    fed.events.push(LineEvent::Interrupt);
                }
                CTRL_D => {
                    fed.events.push(LineEvent::EndOfInput);
                    break;
                }
                0x20..=0x7e | 0x80..=0xff => {
                    self.buf.push(byte);
                    fed.echo.push(byte);
                }
                // Other control bytes are dropped
                _ => {}
            }
        }

        fed
    }

    /// Cursor-key final byte: `A` walks back through history, `B` forward
    fn navigate(&mut self, final_byte: u8, fed: &mut Fed) {
        match final_byte {
            b'A' if self.history_pos > 0 => {
                self.history_pos -= 1;
                self.replace_line(fed);
            }
            b'B' if self.history_pos < self.history.len() => {
                self.history_pos += 1;
                self.replace_line(fed);
            }
            _ => {}
        }
    }

    /// Erase the visible line and re-render the selected history entry
    /// (or a blank line past the newest entry).
    fn replace_line(&mut self, fed: &mut Fed) {
        for _ in 0..self.buf.len() {
            fed.echo.extend_from_slice(b"\x08 \x08");
        }
        self.buf.clear();
        if let Some(entry) = self.history.get(self.history_pos) {
            self.buf.extend_from_slice(entry.as_bytes());
        }
        fed.echo.extend_from_slice(&self.buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn printable_bytes_echo_and_accumulate() {
        let mut line = LineDiscipline::new();
        let fed = line.feed(b"ls");
        assert_eq!(fed.echo, b"ls");
        assert!(fed.events.is_empty());

        let fed = line.feed(b"\r");
        assert_eq!(fed.echo, b"\r\n");
        assert_eq!(fed.events, vec![LineEvent::Line("ls".to_string())]);
    }

    #[test]
    fn crlf_completes_a_single_line() {
        let mut line = LineDiscipline::new();
        let fed = line.feed(b"whoami\r\n");
        assert_eq!(fed.events, vec![LineEvent::Line("whoami".to_string())]);
    }

    #[test]
    fn bare_lf_also_completes_a_line() {
        let mut line = LineDiscipline::new();
        let fed = line.feed(b"whoami\n");
        assert_eq!(fed.events, vec![LineEvent::Line("whoami".to_string())]);
    }

    #[test]
    fn cr_and_lf_in_separate_reads_still_make_one_line() {
        let mut line = LineDiscipline::new();
        let first = line.feed(b"a\r");
        assert_eq!(first.events.len(), 1);
        let second = line.feed(b"\nb\r");
        assert_eq!(second.events, vec![LineEvent::Line("b".to_string())]);
    }

    #[test]
    fn backspace_erases_the_last_byte() {
        let mut line = LineDiscipline::new();
        let fed = line.feed(b"ecgo\x7f\x7fho\r");
        assert_eq!(fed.events, vec![LineEvent::Line("echo".to_string())]);
        // Two erase sequences were echoed
        let erases = fed
            .echo
            .windows(3)
            .filter(|w| w == b"\x08 \x08")
            .count();
        assert_eq!(erases, 2);
    }

    #[test]
    fn backspace_on_empty_buffer_rings_the_bell() {
        let mut line = LineDiscipline::new();
        let fed = line.feed(&[DEL]);
        assert_eq!(fed.echo, vec![BELL]);
        assert!(fed.events.is_empty());
    }

    #[test]
    fn ctrl_c_discards_the_partial_line() {
        let mut line = LineDiscipline::new();
        let fed = line.feed(b"rm -rf /\x03quit\r");
        assert_eq!(
            fed.events,
            vec![
                LineEvent::Interrupt,
                LineEvent::Line("quit".to_string())
            ]
        );
    }

    #[test]
    fn ctrl_d_ends_input_and_stops_processing() {
        let mut line = LineDiscipline::new();
        let fed = line.feed(b"\x04ignored");
        assert_eq!(fed.events, vec![LineEvent::EndOfInput]);
        assert!(fed.echo.is_empty());
    }

    #[test]
    fn invalid_utf8_degrades_lossily() {
        let mut line = LineDiscipline::new();
        let fed = line.feed(b"ab\xff\r");
        assert_eq!(
            fed.events,
            vec![LineEvent::Line("ab\u{fffd}".to_string())]
        );
    }

    #[test]
    fn other_control_bytes_are_dropped() {
        let mut line = LineDiscipline::new();
        let fed = line.feed(b"a\x1b\x00b\r");
        assert_eq!(fed.events, vec![LineEvent::Line("ab".to_string())]);
    }

    #[test]
    fn arrow_key_sequences_do_not_leak_into_the_line() {
        let mut line = LineDiscipline::new();
        // Up arrow with no history recalls nothing and types nothing
        let fed = line.feed(b"\x1b[Awhoami\r");
        assert_eq!(fed.events, vec![LineEvent::Line("whoami".to_string())]);
        assert_eq!(fed.echo, b"whoami\r\n");
    }

    #[test]
    fn up_arrow_recalls_the_previous_line() {
        let mut line = LineDiscipline::new();
        line.feed(b"whoami\r");
        let fed = line.feed(b"\x1b[A\r");
        assert_eq!(fed.events, vec![LineEvent::Line("whoami".to_string())]);
        assert_eq!(fed.echo, b"whoami\r\n");
    }

    #[test]
    fn up_arrow_replaces_a_partially_typed_line() {
        let mut line = LineDiscipline::new();
        line.feed(b"whoami\r");
        let fed = line.feed(b"wh\x1b[A\r");
        assert_eq!(fed.events, vec![LineEvent::Line("whoami".to_string())]);
        // The two typed bytes were erased before the recalled line rendered
        let erases = fed.echo.windows(3).filter(|w| w == b"\x08 \x08").count();
        assert_eq!(erases, 2);
    }

    #[test]
    fn down_arrow_walks_forward_to_a_blank_line() {
        let mut line = LineDiscipline::new();
        line.feed(b"ls\r");
        line.feed(b"\x1b[A");
        let fed = line.feed(b"\x1b[B\r");
        assert_eq!(fed.events, vec![LineEvent::Line(String::new())]);
    }

    #[test]
    fn application_mode_arrows_recall_history_too() {
        let mut line = LineDiscipline::new();
        line.feed(b"echo hi\r");
        let fed = line.feed(b"\x1bOA\r");
        assert_eq!(fed.events, vec![LineEvent::Line("echo hi".to_string())]);
    }

    #[test]
    fn csi_sequences_with_parameter_bytes_are_swallowed_whole() {
        let mut line = LineDiscipline::new();
        // Delete key sends ESC [ 3 ~
        let fed = line.feed(b"ab\x1b[3~cd\r");
        assert_eq!(fed.events, vec![LineEvent::Line("abcd".to_string())]);
    }

    #[test]
    fn history_skips_empty_lines() {
        let mut line = LineDiscipline::new();
        line.feed(b"whoami\r");
        line.feed(b"\r");
        let fed = line.feed(b"\x1b[A\r");
        assert_eq!(fed.events, vec![LineEvent::Line("whoami".to_string())]);
    }
}
