//! Capture and quit trigger plumbing
//!
//! The capture loop never blocks on input: trigger events are produced by an
//! input thread and polled once per tick from a channel. The embedding
//! application can substitute any sender it likes (button, API call); the
//! stdin reader below is the default keyboard surface.

use crossbeam_channel::{Receiver, Sender};
use std::io::BufRead;
use tracing::warn;

/// A control event for the capture loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEvent {
    /// Capture the current frame
    Capture,
    /// Stop the session
    Quit,
}

/// Parse one line of operator input into a trigger event
pub fn parse_trigger(input: &str) -> Option<TriggerEvent> {
    match input.trim() {
        "c" | "C" => Some(TriggerEvent::Capture),
        "q" | "Q" => Some(TriggerEvent::Quit),
        _ => None,
    }
}

/// Spawn a thread that reads trigger lines from stdin.
///
/// The thread exits when stdin closes, a quit event is sent, or the
/// receiving side is dropped.
pub fn stdin_triggers() -> Receiver<TriggerEvent> {
    let (tx, rx) = crossbeam_channel::unbounded();

    std::thread::spawn(move || {
        read_triggers(std::io::stdin().lock(), &tx);
    });

    rx
}

fn read_triggers<R: BufRead>(reader: R, tx: &Sender<TriggerEvent>) {
    for line in reader.lines() {
        let Ok(line) = line else { break };

        match parse_trigger(&line) {
            Some(event) => {
                let quit = event == TriggerEvent::Quit;
                if tx.send(event).is_err() || quit {
                    break;
                }
            }
            None if line.trim().is_empty() => {}
            None => warn!("Unrecognized input {:?} (use 'c' to capture, 'q' to quit)", line.trim()),
        }
    }
}
