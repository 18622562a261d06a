//! Redis-style glob patterns.
//!
//! Supports `*`, `?`, `[...]` classes (with `^` negation) and `\` escapes,
//! the subset Redis `SCAN MATCH` understands. The local store uses the same
//! syntax so both backends agree on which keys a pattern covers.

use outcache_core::{OutcacheError, OutcacheResult};
use regex::Regex;

/// A compiled glob pattern.
#[derive(Debug, Clone)]
pub struct GlobMatcher {
    pattern: String,
    regex: Regex,
}

impl GlobMatcher {
    pub fn new(pattern: &str) -> OutcacheResult<Self> {
        let regex = Regex::new(&glob_to_regex(pattern)).map_err(|e| {
            OutcacheError::invalid_argument(format!("invalid glob pattern '{}': {}", pattern, e))
        })?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    #[must_use]
    pub fn is_match(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

fn glob_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2 + 2);
    out.push('^');

    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '\\' => match chars.next() {
                Some(escaped) => out.push_str(&regex::escape(&escaped.to_string())),
                None => out.push_str(r"\\"),
            },
            '[' => {
                let mut class = String::from("[");
                let mut raw = String::from("[");
                let mut closed = false;
                let mut first = true;
                while let Some(inner) = chars.next() {
                    raw.push(inner);
                    match inner {
                        ']' if !first => {
                            closed = true;
                            break;
                        }
                        '^' if first => {
                            class.push('^');
                            continue;
                        }
                        '-' if !first => class.push('-'),
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                raw.push(escaped);
                                push_class_literal(&mut class, escaped);
                            }
                        }
                        other => push_class_literal(&mut class, other),
                    }
                    first = false;
                }
                if closed {
                    class.push(']');
                    out.push_str(&class);
                } else {
                    // Unterminated class matches literally.
                    out.push_str(&regex::escape(&raw));
                }
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }

    out.push('$');
    out
}

fn push_class_literal(class: &mut String, c: char) {
    if c.is_ascii_punctuation() {
        class.push('\\');
    }
    class.push(c);
}
