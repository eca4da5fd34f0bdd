//! Field escaping
//!
//! Lets any field value survive a write/parse cycle:
//!
//! ```text
//!  \\  backslash          \|  pipe            \,  comma
//!  \n  newline            \r  carriage return \t  tab
//!  \s  space (only at the start or end of a field)
//!  \u{hex}  other whitespace at the start or end of a field
//! ```
//!
//! Any other backslash sequence is read back literally, so hand-written
//! lines without escapes parse as before.

use std::borrow::Cow;
use std::iter::Peekable;
use std::str::Chars;

/// Escape one field for writing
pub fn escape_field(value: &str) -> Cow<'_, str> {
    let needs_escape = value.contains(['\\', '|', ',', '\n', '\r'])
        || value.trim() != value;
    if !needs_escape {
        return Cow::Borrowed(value);
    }

    let lead = value.len() - value.trim_start().len();
    let trail_start = value.trim_end().len().max(lead);

    let mut out = String::with_capacity(value.len() + 8);
    for (index, c) in value.char_indices() {
        let at_edge = index < lead || index >= trail_start;
        match c {
            '\\' => out.push_str("\\\\"),
            '|' => out.push_str("\\|"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' if at_edge => out.push_str("\\t"),
            ' ' if at_edge => out.push_str("\\s"),
            c if at_edge && c.is_whitespace() => {
                out.push_str(&format!("\\u{{{:x}}}", c as u32));
            }
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Reverse `escape_field`
pub fn unescape_field(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some(next @ ('\\' | '|' | ',')) => {
                chars.next();
                out.push(next);
            }
            Some('n') => {
                chars.next();
                out.push('\n');
            }
            Some('r') => {
                chars.next();
                out.push('\r');
            }
            Some('t') => {
                chars.next();
                out.push('\t');
            }
            Some('s') => {
                chars.next();
                out.push(' ');
            }
            Some('u') => match read_unicode(&mut chars) {
                Some(decoded) => out.push(decoded),
                None => out.push('\\'),
            },
            _ => out.push('\\'),
        }
    }
    out
}

/// Delimiter of a data line: the first unescaped `|` wins, else `,`
pub fn detect_delimiter(line: &str) -> Option<char> {
    let mut saw_comma = false;
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '|' => return Some('|'),
            ',' => saw_comma = true,
            _ => {}
        }
    }
    saw_comma.then_some(',')
}

/// Split on unescaped `delimiter`, leaving escapes in place
pub fn split_unescaped(line: &str, delimiter: char) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut start = 0;
    let mut chars = line.char_indices();

    while let Some((index, c)) = chars.next() {
        if c == '\\' {
            chars.next();
        } else if c == delimiter {
            fields.push(&line[start..index]);
            start = index + c.len_utf8();
        }
    }
    fields.push(&line[start..]);
    fields
}

/// Decode `u{hex}` after a backslash; consumes nothing on failure
fn read_unicode(chars: &mut Peekable<Chars<'_>>) -> Option<char> {
    let mut lookahead = chars.clone();
    lookahead.next(); // 'u'
    if lookahead.next() != Some('{') {
        return None;
    }
    let mut hex = String::new();
    for c in lookahead.by_ref() {
        if c == '}' {
            let decoded = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32)?;
            *chars = lookahead;
            return Some(decoded);
        }
        if !c.is_ascii_hexdigit() || hex.len() >= 6 {
            return None;
        }
        hex.push(c);
    }
    None
}
