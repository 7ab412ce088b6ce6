// ==============================================================================
// Errorformat: Vim-style patterns over linter output
// ==============================================================================
//
// Supports the single-line subset that tool configurations actually use:
//
//   %f  filename            %l  line (digits)     %c  column (digits)
//   %m  message             %t  category char     %n  error number (digits)
//   %e  end line (digits)   %k  end column (digits)
//   %%  literal percent
//
// Each pattern compiles to one anchored regex; a scanner tries the patterns
// in order against every line of output and yields an entry for the first
// match. Lines no pattern matches are skipped. Anything else after `%` is a
// configuration error surfaced as `Error::InvalidFormat`.

use regex::Regex;

use crate::error::{Error, Result};

/// Patterns used when a config leaves `lintFormats` empty.
pub const DEFAULT_LINT_FORMATS: [&str; 2] = ["%f:%l:%m", "%f:%l:%c:%m"];

/// One structured record scanned from linter output. Numeric fields are 0
/// when the pattern did not capture them; lines and columns are 1-based as
/// reported by the tool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Entry {
    pub filename: String,
    pub lnum: i64,
    pub end_lnum: i64,
    pub col: i64,
    pub end_col: i64,
    pub nr: i64,
    pub category: Option<char>,
    pub text: String,
}

#[derive(Debug)]
pub struct Errorformat {
    patterns: Vec<Regex>,
}

impl Errorformat {
    /// Compile a pattern list. The original format strings are echoed back in
    /// the error because that is what the user has to fix.
    pub fn new(formats: &[String]) -> Result<Self> {
        let mut patterns = Vec::with_capacity(formats.len());
        for format in formats {
            let regex = translate(format).ok_or_else(|| Error::InvalidFormat(formats.to_vec()))?;
            patterns.push(regex);
        }
        Ok(Self { patterns })
    }

    /// Scan output line by line; first matching pattern wins per line.
    pub fn scan(&self, output: &str) -> Vec<Entry> {
        let mut entries = Vec::new();
        for line in output.lines() {
            if let Some(entry) = self.scan_line(line) {
                entries.push(entry);
            }
        }
        entries
    }

    fn scan_line(&self, line: &str) -> Option<Entry> {
        for pattern in &self.patterns {
            let Some(caps) = pattern.captures(line) else {
                continue;
            };
            let number = |name: &str| -> i64 {
                caps.name(name)
                    .and_then(|m| m.as_str().parse().ok())
                    .unwrap_or(0)
            };
            return Some(Entry {
                filename: caps
                    .name("file")
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default(),
                lnum: number("lnum"),
                end_lnum: number("end_lnum"),
                col: number("col"),
                end_col: number("end_col"),
                nr: number("nr"),
                category: caps
                    .name("category")
                    .and_then(|m| m.as_str().chars().next()),
                text: caps
                    .name("text")
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default(),
            });
        }
        None
    }
}

/// `%x` tokens to regex; literal text is escaped. Returns None for unknown
/// tokens or a trailing bare `%`.
fn translate(format: &str) -> Option<Regex> {
    let mut pattern = String::from("^");
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            pattern.push_str(&regex::escape(&c.to_string()));
            continue;
        }
        match chars.next()? {
            'f' => pattern.push_str(r"(?P<file>(?:[A-Za-z]:)?[^:\n]+)"),
            'l' => pattern.push_str(r"(?P<lnum>\d+)"),
            'c' => pattern.push_str(r"(?P<col>\d+)"),
            'e' => pattern.push_str(r"(?P<end_lnum>\d+)"),
            'k' => pattern.push_str(r"(?P<end_col>\d+)"),
            'n' => pattern.push_str(r"(?P<nr>\d+)"),
            't' => pattern.push_str(r"(?P<category>\S)"),
            'm' => pattern.push_str(r"(?P<text>.+)"),
            '%' => pattern.push('%'),
            _ => return None,
        }
    }
    pattern.push('$');
    Regex::new(&pattern).ok()
}
