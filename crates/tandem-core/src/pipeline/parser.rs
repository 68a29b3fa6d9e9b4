use std::sync::Arc;

use crate::types::LogEntry;

/// Turns one text line into a record.
///
/// Returning `None` marks the line as skipped; it is never an error.
pub trait LineParser: Send + Sync {
    fn parse_line(&self, line: &str, source: &Arc<str>, line_number: u32) -> Option<LogEntry>;
}

/// Parser for bracketed error logs and common-log-format access logs.
///
/// ```text
/// [2024-01-15 10:30:45] [ERROR] Database connection failed
/// 192.168.1.10 - - [15/Jan/2024:10:30:45 +0000] "GET /index.html HTTP/1.1" 200 1234
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LogLineParser;

impl LineParser for LogLineParser {
    fn parse_line(&self, line: &str, source: &Arc<str>, line_number: u32) -> Option<LogEntry> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let (timestamp, level, message) = if line.starts_with('[') {
            parse_error_line(line)?
        } else {
            parse_access_line(line)?
        };

        Some(LogEntry::new(
            timestamp,
            level,
            message,
            Arc::clone(source),
            line_number,
        ))
    }
}

fn parse_error_line(line: &str) -> Option<(&str, &str, String)> {
    let (timestamp, rest) = bracketed(line)?;
    let (level, rest) = bracketed(rest.trim_start())?;
    if timestamp.is_empty() || level.is_empty() {
        return None;
    }
    Some((timestamp, level, rest.trim().to_owned()))
}

fn parse_access_line(line: &str) -> Option<(&str, &str, String)> {
    let (client, rest) = line.split_once(char::is_whitespace)?;
    if client.is_empty() {
        return None;
    }

    let open = rest.find('[')?;
    let (timestamp, rest) = bracketed(&rest[open..])?;

    let rest = rest.trim_start().strip_prefix('"')?;
    let (request, rest) = rest.split_once('"')?;

    let mut request = request.split_whitespace();
    let method = request.next()?;
    let path = request.next()?;

    let message = match rest.split_whitespace().next().map(str::parse::<u16>) {
        Some(Ok(status)) => format!("{method} {path} -> {status}"),
        _ => format!("{method} {path}"),
    };

    Some((timestamp, method, message))
}

/// Splits `"[inner] rest"` into `("inner", " rest")`.
fn bracketed(text: &str) -> Option<(&str, &str)> {
    let inner = text.strip_prefix('[')?;
    let close = inner.find(']')?;
    Some((&inner[..close], &inner[close + 1..]))
}
