//! Reversible escaping between fully-qualified names and external ids.
//!
//! Bytes in `A-Z a-z 0-9 _ . - ~` pass through unchanged, a space becomes
//! `+`, and every other byte is written as `%XX` with uppercase hex digits.
//! The output is plain ASCII without `/`, so an id is usable as a flat key.

use crate::error::TypeError;

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-' | b'~')
}

/// Escape an FQN into its external identifier.
pub fn encode(fqname: &str) -> String {
    let mut out = String::with_capacity(fqname.len());
    for &b in fqname.as_bytes() {
        if is_unreserved(b) {
            out.push(b as char);
        } else if b == b' ' {
            out.push('+');
        } else {
            out.push('%');
            out.push_str(&hex::encode_upper([b]));
        }
    }
    out
}

/// Recover the FQN an identifier was produced from.
pub fn decode(id: &str) -> Result<String, TypeError> {
    let invalid = |reason: &str| TypeError::InvalidIdentifier {
        id: id.to_string(),
        reason: reason.to_string(),
    };

    let bytes = id.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' => {
                let pair = bytes
                    .get(i + 1..i + 3)
                    .ok_or_else(|| invalid("truncated escape"))?;
                let decoded = hex::decode(pair).map_err(|_| invalid("bad escape digits"))?;
                out.extend_from_slice(&decoded);
                i += 3;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8(out).map_err(|_| invalid("not valid UTF-8 once unescaped"))
}
