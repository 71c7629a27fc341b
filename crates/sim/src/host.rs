use std::{collections::VecDeque, fmt};

use log::{info, warn};
use xyplot_control::HostLink;
use xyplot_protocol::Reply;

/// Plays the host's side of the conversation from a script.
///
/// The script is split on whitespace into chunks. The host answers `;Ready;`
/// with a handshake byte and every `;next;` with the next chunk, so each chunk
/// should end with something the device replies to (a command byte, a `;`, or
/// a `q`).
pub struct ScriptedHost {
    chunks: VecDeque<Vec<u8>>,
    pending: VecDeque<u8>,
    connected: bool,
    /// Status lines the device printed.
    pub status: Vec<String>,
    pub waits: usize,
    /// How often the device asked for more before reading what it had.
    pub overruns: usize,
}

impl ScriptedHost {
    pub fn new(script: &str) -> Self {
        let chunks = script
            .lines()
            .map(|line| line.split('#').next().unwrap_or(""))
            .flat_map(str::split_whitespace)
            .map(|chunk| chunk.as_bytes().to_vec())
            .collect();
        ScriptedHost {
            chunks,
            pending: VecDeque::new(),
            connected: false,
            status: Vec::new(),
            waits: 0,
            overruns: 0,
        }
    }

    /// Has the device asked for more than the script has to give?
    pub fn is_stalled(&self) -> bool {
        self.connected && self.pending.is_empty() && self.chunks.is_empty()
    }
}

impl HostLink for ScriptedHost {
    fn poll_byte(&mut self) -> Option<u8> {
        self.pending.pop_front()
    }

    fn send_line(&mut self, line: fmt::Arguments<'_>) {
        let line = line.to_string();
        if line == Reply::Ready.token() {
            if !self.connected {
                self.connected = true;
                self.pending.push_back(b'n');
            }
        } else if line == Reply::Next.token() {
            if !self.pending.is_empty() {
                warn!("asked for more with {} bytes unread", self.pending.len());
                self.overruns += 1;
            }
            if let Some(chunk) = self.chunks.pop_front() {
                self.pending.extend(chunk);
            }
        } else if line == Reply::Wait.token() {
            info!("device is busy drawing");
            self.waits += 1;
        } else {
            info!("device: {line}");
            self.status.push(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(host: &mut ScriptedHost) -> String {
        std::iter::from_fn(|| host.poll_byte()).map(char::from).collect()
    }

    #[test]
    fn stop_and_wait() {
        let mut host = ScriptedHost::new("p C 500;\n# a comment\n q u # trailing");
        assert_eq!(host.poll_byte(), None);
        assert!(!host.is_stalled());

        host.send_line(format_args!(";Ready;"));
        host.send_line(format_args!(";Ready;"));
        assert_eq!(drain(&mut host), "n");

        let mut sent = Vec::new();
        for _ in 0..5 {
            host.send_line(format_args!(";next;"));
            sent.push(drain(&mut host));
        }
        assert_eq!(sent, vec!["p", "C", "500;", "q", "u"]);
        assert!(host.is_stalled());

        host.send_line(format_args!("Done!"));
        assert_eq!(host.status, vec!["Done!"]);
    }
}
