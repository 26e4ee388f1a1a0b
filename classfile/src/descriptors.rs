//! Binary class names, unqualified names, field descriptors and method
//! descriptors: recognizers plus human-readable-string parsers.
//!
//! Grammar is pure ASCII, so this walks bytes directly rather than
//! reaching for a regex engine.

use std::fmt::{self, Display};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidDescriptor(pub String);

impl Display for InvalidDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid descriptor: {}", self.0)
    }
}

impl std::error::Error for InvalidDescriptor {}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}

fn is_ident_continue(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

/// Consumes an identifier segment from `s[pos..]`, returns the new position
/// or `None` if no identifier starts there.
fn scan_identifier(s: &[u8], pos: usize) -> Option<usize> {
    if pos >= s.len() || !is_ident_start(s[pos]) {
        return None;
    }
    let mut i = pos + 1;
    while i < s.len() && is_ident_continue(s[i]) {
        i += 1;
    }
    Some(i)
}

pub fn check_unqualified_name(s: &str) -> bool {
    let b = s.as_bytes();
    match scan_identifier(b, 0) {
        Some(end) => end == b.len(),
        None => false,
    }
}

pub fn check_binary_name(s: &str) -> bool {
    let b = s.as_bytes();
    if b.is_empty() {
        return false;
    }
    let mut pos = 0;
    loop {
        match scan_identifier(b, pos) {
            Some(end) => pos = end,
            None => return false,
        }
        if pos == b.len() {
            return true;
        }
        if b[pos] != b'/' {
            return false;
        }
        pos += 1;
    }
}

/// Returns the position just past a valid field descriptor starting at
/// `pos`, or `None`. Shared by the recognizer and the parser so the two
/// never disagree about what counts as valid.
fn scan_field_descriptor(s: &[u8], pos: usize) -> Option<usize> {
    if pos >= s.len() {
        return None;
    }
    match s[pos] {
        b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' => Some(pos + 1),
        b'L' => {
            let start = pos + 1;
            let semi = s[start..].iter().position(|&c| c == b';')?;
            let end = start + semi;
            let name = std::str::from_utf8(&s[start..end]).ok()?;
            if check_binary_name(name) {
                Some(end + 1)
            } else {
                None
            }
        }
        b'[' => scan_field_descriptor(s, pos + 1),
        _ => None,
    }
}

pub fn check_field_descriptor(s: &str) -> bool {
    let b = s.as_bytes();
    matches!(scan_field_descriptor(b, 0), Some(end) if end == b.len())
}

fn scan_return_descriptor(s: &[u8], pos: usize) -> Option<usize> {
    if pos < s.len() && s[pos] == b'V' {
        return Some(pos + 1);
    }
    scan_field_descriptor(s, pos)
}

pub fn check_method_descriptor(s: &str) -> bool {
    let b = s.as_bytes();
    if b.first() != Some(&b'(') {
        return false;
    }
    let mut pos = 1;
    while pos < b.len() && b[pos] != b')' {
        match scan_field_descriptor(b, pos) {
            Some(end) => pos = end,
            None => return false,
        }
    }
    if b.get(pos) != Some(&b')') {
        return false;
    }
    pos += 1;
    matches!(scan_return_descriptor(b, pos), Some(end) if end == b.len())
}

/// `java/lang/Object` -> `java.lang.Object`.
pub fn parse_binary_class_name(s: &str) -> Result<String, InvalidDescriptor> {
    if !check_binary_name(s) {
        return Err(InvalidDescriptor(s.to_string()));
    }
    Ok(s.replace('/', "."))
}

fn render_field_descriptor(s: &[u8], pos: usize) -> Option<(String, usize)> {
    match s[pos] {
        b'B' => Some(("byte".to_string(), pos + 1)),
        b'C' => Some(("char".to_string(), pos + 1)),
        b'D' => Some(("double".to_string(), pos + 1)),
        b'F' => Some(("float".to_string(), pos + 1)),
        b'I' => Some(("int".to_string(), pos + 1)),
        b'J' => Some(("long".to_string(), pos + 1)),
        b'S' => Some(("short".to_string(), pos + 1)),
        b'Z' => Some(("boolean".to_string(), pos + 1)),
        b'L' => {
            let start = pos + 1;
            let semi = s[start..].iter().position(|&c| c == b';')?;
            let end = start + semi;
            let name = std::str::from_utf8(&s[start..end]).ok()?;
            let dotted = parse_binary_class_name(name).ok()?;
            Some((dotted, end + 1))
        }
        b'[' => {
            let (inner, end) = render_field_descriptor(s, pos + 1)?;
            Some((format!("{inner}[]"), end))
        }
        _ => None,
    }
}

pub fn parse_field_descriptor(s: &str) -> Result<String, InvalidDescriptor> {
    let b = s.as_bytes();
    match render_field_descriptor(b, 0) {
        Some((rendered, end)) if end == b.len() => Ok(rendered),
        _ => Err(InvalidDescriptor(s.to_string())),
    }
}

/// Parses `(params)return` into `(params-as-strings, return-as-string)`.
pub fn parse_method_descriptor(s: &str) -> Result<(Vec<String>, String), InvalidDescriptor> {
    let b = s.as_bytes();
    if b.first() != Some(&b'(') {
        return Err(InvalidDescriptor(s.to_string()));
    }
    let mut params = Vec::new();
    let mut pos = 1;
    while pos < b.len() && b[pos] != b')' {
        let (rendered, end) =
            render_field_descriptor(b, pos).ok_or_else(|| InvalidDescriptor(s.to_string()))?;
        params.push(rendered);
        pos = end;
    }
    if b.get(pos) != Some(&b')') {
        return Err(InvalidDescriptor(s.to_string()));
    }
    pos += 1;
    if b.get(pos) == Some(&b'V') && pos + 1 == b.len() {
        return Ok((params, "void".to_string()));
    }
    match render_field_descriptor(b, pos) {
        Some((rendered, end)) if end == b.len() => Ok((params, rendered)),
        _ => Err(InvalidDescriptor(s.to_string())),
    }
}

/// Returns the substring after the last `.`, or the input unchanged.
pub fn unqualify(s: &str) -> &str {
    match s.rfind('.') {
        Some(idx) => &s[idx + 1..],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unqualified_name() {
        assert!(check_unqualified_name("main"));
        assert!(check_unqualified_name("_$foo9"));
        assert!(!check_unqualified_name("foo/bar"));
        assert!(!check_unqualified_name("9foo"));
        assert!(!check_unqualified_name(""));
    }

    #[test]
    fn binary_name() {
        assert!(check_binary_name("java/lang/Object"));
        assert!(check_binary_name("Foo"));
        assert!(!check_binary_name("java/lang/"));
        assert!(!check_binary_name("/java"));
    }

    #[test]
    fn field_descriptor_primitives_and_arrays() {
        assert!(check_field_descriptor("I"));
        assert!(check_field_descriptor("[[I"));
        assert!(check_field_descriptor("Ljava/lang/String;"));
        assert!(check_field_descriptor("[Ljava/lang/String;"));
        assert!(!check_field_descriptor("Ljava/lang/String"));
        assert!(!check_field_descriptor("Q"));
    }

    #[test]
    fn method_descriptor_zero_params() {
        assert_eq!(
            parse_method_descriptor("()V").unwrap(),
            (vec![], "void".to_string())
        );
        assert!(check_method_descriptor("()V"));
    }

    #[test]
    fn method_descriptor_round_trip_matches_check() {
        let d = "(II)V";
        assert_eq!(check_method_descriptor(d), parse_method_descriptor(d).is_ok());
        let bad = "(I)Q";
        assert_eq!(check_method_descriptor(bad), parse_method_descriptor(bad).is_ok());
    }

    #[test]
    fn deep_array_nesting_parses() {
        let d = format!("{}I", "[".repeat(255));
        assert!(check_field_descriptor(&d));
        let rendered = parse_field_descriptor(&d).unwrap();
        assert!(rendered.ends_with("[]"));
    }

    #[test]
    fn unqualify_idempotent() {
        for s in ["a.b.C", "NoDots", ""] {
            let once = unqualify(s);
            assert_eq!(unqualify(once), once);
        }
    }

    #[test]
    fn rejects_trailing_bytes() {
        assert!(!check_field_descriptor("II"));
        assert!(!check_method_descriptor("()VV"));
    }
}
