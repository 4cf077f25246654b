//! Event-channel message encoding.
//! - encode_process_id: first message on a fresh connection
//! - encode_plain/encode_task: one line of build output each
//! - split_lines: multi-line text to wire lines
//! - format_elapsed: build duration summary

use std::time::Duration;

use crate::event::SourceLocation;

/// Prefix of the process identity message.
pub const PROCESS_ID_TAG: &str = "processID";
/// Prefix of a task message.
pub const TASK_TAG: &str = "\u{1}";
/// Field delimiter shared by every message form.
pub const DELIMITER: char = ',';
/// Level carried by debug milestone markers.
pub const MARKER_LEVEL: i32 = -1;

/// `<PROCESS_ID_TAG><id>`
#[must_use]
pub fn encode_process_id(process_id: &str) -> String {
    format!("{PROCESS_ID_TAG}{process_id}")
}

/// `<level>,<line>`
#[must_use]
pub fn encode_plain(level: i32, line: &str) -> String {
    format!("{level}{DELIMITER}{line}")
}

/// `<TASK_TAG><level>,<task>,<label length>,<label>,<location>` where the
/// label is `[task] line`, trimmed.
#[must_use]
pub fn encode_task(
    level: i32,
    task_name: &str,
    line: &str,
    location: Option<&SourceLocation>,
) -> String {
    let label = format!("[{task_name}] {line}");
    let label = label.trim();
    let location = location.map(ToString::to_string).unwrap_or_default();
    format!(
        "{TASK_TAG}{level}{DELIMITER}{task_name}{DELIMITER}{}{DELIMITER}{label}{DELIMITER}{location}",
        label.chars().count()
    )
}

/// Split text on `\r\n`, `\n` or a lone `\r`.
///
/// Empty text yields no lines; a trailing terminator does not add one.
#[must_use]
pub fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        match rest.find(['\r', '\n']) {
            Some(index) => {
                lines.push(&rest[..index]);
                let skip = if rest[index..].starts_with("\r\n") { 2 } else { 1 };
                rest = &rest[index + skip..];
            }
            None => {
                lines.push(rest);
                break;
            }
        }
    }
    lines
}

/// Render a build duration in whole minutes and seconds, leaving out a zero
/// unit. Durations under one second fall back to milliseconds.
#[must_use]
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_seconds = elapsed.as_secs();
    let minutes = u128::from(total_seconds / 60);
    let seconds = u128::from(total_seconds % 60);
    match (minutes, seconds) {
        (0, 0) => {
            let millis = elapsed.as_millis();
            format!("{millis} {}", plural(millis, "millisecond"))
        }
        (0, seconds) => format!("{seconds} {}", plural(seconds, "second")),
        (minutes, 0) => format!("{minutes} {}", plural(minutes, "minute")),
        (minutes, seconds) => format!(
            "{minutes} {} {seconds} {}",
            plural(minutes, "minute"),
            plural(seconds, "second")
        ),
    }
}

fn plural(count: u128, unit: &str) -> String {
    if count == 1 {
        unit.to_string()
    } else {
        format!("{unit}s")
    }
}
