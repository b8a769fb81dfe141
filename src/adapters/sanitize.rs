//! Log redaction for session identifiers and other caller-linked tokens.
//!
//! Formatted log lines pass through [`RedactingMakeWriter`] before reaching the
//! sink, so a session id or cookie value never lands in a log file even if a
//! callsite formats one by accident. Survey answers are not logged at all;
//! this is the backstop for identifiers.
//!
//! Input longer than `HEARTCHECK_REDACT_MAX_BYTES` (default 16 KiB) is cut
//! before scanning.

use std::sync::OnceLock;

use regex::{Regex, RegexSet};
use tracing_subscriber::fmt::MakeWriter;

const DEFAULT_REDACT_MAX_BYTES: usize = 16 * 1024;

struct Rule {
    regex: Regex,
    replacement: &'static str,
}

struct Rules {
    any: RegexSet,
    rules: Vec<Rule>,
}

static RULES: OnceLock<Rules> = OnceLock::new();

fn rules() -> &'static Rules {
    RULES.get_or_init(|| {
        let table: [(&str, &str); 4] = [
            // Cookie headers first so the whole value is dropped, ids included.
            (r"(?i)\b(set-)?cookie\s*[:=]\s*[^\r\n]*", "cookie: [REDACTED-COOKIE]"),
            (
                r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
                "[REDACTED-SESSION]",
            ),
            (
                r"(?i)\b[a-z0-9._%+-]{1,64}@(?:[a-z0-9-]{1,63}\.)+[a-z]{2,}\b",
                "[REDACTED-EMAIL]",
            ),
            (r"\b[0-9a-fA-F]{32,}\b", "[REDACTED-TOKEN]"),
        ];

        let any = RegexSet::new(table.iter().map(|(p, _)| *p)).expect("Valid regex set");
        let rules = table
            .iter()
            .map(|(pattern, replacement)| Rule {
                regex: Regex::new(pattern).expect("Valid regex"),
                replacement,
            })
            .collect();
        Rules { any, rules }
    })
}

fn max_redact_bytes() -> usize {
    std::env::var("HEARTCHECK_REDACT_MAX_BYTES")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(DEFAULT_REDACT_MAX_BYTES)
}

fn cut_at_char_boundary(input: &str, max_bytes: usize) -> (&str, bool) {
    if input.len() <= max_bytes {
        return (input, false);
    }
    let mut end = max_bytes;
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    (&input[..end], true)
}

/// Replace identifiers in `input` with redaction markers.
#[must_use]
pub fn redact(input: &str) -> String {
    redact_with_limit(input, max_redact_bytes())
}

fn redact_with_limit(input: &str, max_bytes: usize) -> String {
    let rules = rules();
    let (prefix, truncated) = cut_at_char_boundary(input, max_bytes);

    let mut out = prefix.to_string();
    let matched: Vec<usize> = rules.any.matches(prefix).into_iter().collect();
    for idx in matched {
        let rule = &rules.rules[idx];
        out = rule.regex.replace_all(&out, rule.replacement).into_owned();
    }

    if truncated {
        out.push_str(" [TRUNCATED]");
    }
    out
}

/// Whether `input` holds anything [`redact`] would replace.
#[must_use]
pub fn needs_redaction(input: &str) -> bool {
    let (prefix, _) = cut_at_char_boundary(input, max_redact_bytes());
    rules().any.is_match(prefix)
}

/// `tracing_subscriber` writer factory that redacts each formatted line.
#[derive(Debug, Clone)]
pub struct RedactingMakeWriter<M> {
    inner: M,
}

impl<M> RedactingMakeWriter<M> {
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

/// Line-buffering writer produced by [`RedactingMakeWriter`].
pub struct RedactingWriter<W: std::io::Write> {
    inner: W,
    pending: Vec<u8>,
}

impl<W: std::io::Write> RedactingWriter<W> {
    fn emit(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        let text = String::from_utf8_lossy(bytes);
        // Clean lines within the cap go out untouched.
        if text.len() <= max_redact_bytes() && !needs_redaction(&text) {
            return self.inner.write_all(text.as_bytes());
        }
        self.inner.write_all(redact(&text).as_bytes())
    }

    fn drain_lines(&mut self) -> std::io::Result<()> {
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.emit(&line)?;
        }
        Ok(())
    }
}

impl<W: std::io::Write> std::io::Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.pending.extend_from_slice(buf);

        // A formatter that never writes a newline must not grow the buffer forever.
        if self.pending.len() > max_redact_bytes().saturating_mul(2) {
            let all = std::mem::take(&mut self.pending);
            self.emit(&all)?;
            self.inner.write_all(b"\n")?;
            return Ok(buf.len());
        }

        self.drain_lines()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.drain_lines()?;
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.emit(&rest)?;
        }
        self.inner.flush()
    }
}

impl<W: std::io::Write> Drop for RedactingWriter<W> {
    fn drop(&mut self) {
        let _ = std::io::Write::flush(self);
    }
}

impl<'a, M> MakeWriter<'a> for RedactingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = RedactingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter {
            inner: self.inner.make_writer(),
            pending: Vec::new(),
        }
    }
}
