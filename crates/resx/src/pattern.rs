//! Path matching for the access-control matrix.
//!
//! Two rule forms are accepted: an extended glob (`*`, `**`, `?`,
//! `[abc]`/`[a-z]`/`[!abc]`, `{a,b}`, `\` escape) and a compiled regex.
//! Matching is anchored and whole-path in both forms.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};

/// One compiled path rule.
#[derive(Debug, Clone)]
pub enum PathPattern {
    Glob(Glob),
    Regex(Regex),
}

impl PathPattern {
    /// Compile an extended glob. Literal strings are a degenerate glob
    /// (no wildcard characters), so they take this form too.
    pub fn glob(pattern: &str) -> Result<Self> {
        Ok(PathPattern::Glob(Glob::compile(pattern)?))
    }

    pub fn regex(re: Regex) -> Self {
        PathPattern::Regex(re)
    }

    /// Whole-path match, anchored at both ends.
    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Glob(glob) => glob.matches(path),
            PathPattern::Regex(re) => match re.find(path) {
                Some(m) => m.start() == 0 && m.end() == path.len(),
                None => false,
            },
        }
    }
}

/// A glob split on the path separator. `**` segments match any number of
/// path segments; every other segment is translated to an anchored
/// regex, compiled on first use.
#[derive(Debug, Clone)]
pub struct Glob {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone)]
enum Segment {
    /// `**`: any number of segments, including none.
    Any,
    Literal {
        source: String,
        compiled: OnceLock<Option<Regex>>,
    },
}

impl Glob {
    pub fn compile(pattern: &str) -> Result<Self> {
        let segments = pattern
            .split('/')
            .map(|seg| {
                if seg == "**" {
                    Ok(Segment::Any)
                } else {
                    Ok(Segment::Literal {
                        source: format!("^{}$", translate_segment(seg)?),
                        compiled: OnceLock::new(),
                    })
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { segments })
    }

    pub fn matches(&self, path: &str) -> bool {
        let parts: Vec<&str> = path.split('/').collect();
        let mut seen = HashSet::new();
        self.match_from(&parts, 0, 0, &mut seen)
    }

    fn match_from(
        &self,
        parts: &[&str],
        pat: usize,
        cursor: usize,
        seen: &mut HashSet<(usize, usize)>,
    ) -> bool {
        if !seen.insert((pat, cursor)) {
            return false;
        }
        match self.segments.get(pat) {
            None => cursor == parts.len(),
            Some(Segment::Any) => {
                // Advance the path cursor segment by segment until the
                // rest of the pattern matches.
                (cursor..=parts.len()).any(|next| self.match_from(parts, pat + 1, next, seen))
            }
            Some(seg @ Segment::Literal { .. }) => {
                cursor < parts.len()
                    && seg.matches(parts[cursor])
                    && self.match_from(parts, pat + 1, cursor + 1, seen)
            }
        }
    }
}

impl Segment {
    fn matches(&self, part: &str) -> bool {
        match self {
            Segment::Any => true,
            Segment::Literal { source, compiled } => compiled
                .get_or_init(|| Regex::new(source).ok())
                .as_ref()
                .map(|re| re.is_match(part))
                .unwrap_or(false),
        }
    }
}

/// Translate one glob segment into regex source. The segment never
/// contains the path separator.
fn translate_segment(segment: &str) -> Result<String> {
    let mut out = String::new();
    let mut chars = segment.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '\\' => match chars.next() {
                Some(escaped) => out.push_str(&regex::escape(&escaped.to_string())),
                None => return Err(Error::invalid("glob ends in a bare escape")),
            },
            '[' => {
                out.push('[');
                if chars.peek() == Some(&'!') {
                    chars.next();
                    out.push('^');
                }
                let mut closed = false;
                for inner in chars.by_ref() {
                    match inner {
                        ']' => {
                            closed = true;
                            break;
                        }
                        '\\' | '^' => {
                            out.push('\\');
                            out.push(inner);
                        }
                        other => out.push(other),
                    }
                }
                if !closed {
                    return Err(Error::invalid("glob character class is not closed"));
                }
                out.push(']');
            }
            '{' => {
                let mut depth = 1usize;
                let mut body = String::new();
                for inner in chars.by_ref() {
                    match inner {
                        '{' => {
                            depth += 1;
                            body.push(inner);
                        }
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                            body.push(inner);
                        }
                        _ => body.push(inner),
                    }
                }
                if depth != 0 {
                    return Err(Error::invalid("glob alternation is not closed"));
                }
                let alternatives = split_alternatives(&body)
                    .iter()
                    .map(|alt| translate_segment(alt))
                    .collect::<Result<Vec<_>>>()?;
                out.push_str("(?:");
                out.push_str(&alternatives.join("|"));
                out.push(')');
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    Ok(out)
}

/// Split an alternation body on top-level commas only.
fn split_alternatives(body: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for c in body.chars() {
        match c {
            '{' => {
                depth += 1;
                current.push(c);
            }
            '}' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => {
                out.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    out.push(current);
    out
}
