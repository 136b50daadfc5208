//! Reversible file name obfuscation.
//!
//! Each character becomes its code point written as a zero-padded,
//! fixed-width decimal field: `"hi"` encodes to `"104105"`. Only code points
//! up to 999 fit in a field; wider characters are rejected rather than
//! silently breaking the fixed-width layout the decoder relies on.

use crate::config::name_params::{FIELD_WIDTH, MAX_CODE_POINT};
use crate::error::{Error, Result};

/// Encode a name as concatenated 3-digit code points.
pub fn encode_name(name: &str) -> Result<String> {
    let mut out = String::with_capacity(name.len() * FIELD_WIDTH);
    for ch in name.chars() {
        let code_point = ch as u32;
        if code_point > MAX_CODE_POINT {
            return Err(Error::UnencodableName {
                name: name.to_string(),
                code_point,
            });
        }
        out.push_str(&format!("{:0width$}", code_point, width = FIELD_WIDTH));
    }
    Ok(out)
}

/// Decode a name produced by [`encode_name`].
///
/// Fails unless `code` is a non-empty run of 3-digit fields that decode to a
/// usable single path component.
pub fn decode_name(code: &str) -> Result<String> {
    if code.is_empty() || code.len() % FIELD_WIDTH != 0 || !code.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(Error::InvalidEncodedName(code.to_string()));
    }

    let mut out = String::with_capacity(code.len() / FIELD_WIDTH);
    for field in code.as_bytes().chunks(FIELD_WIDTH) {
        let code_point = field
            .iter()
            .fold(0u32, |acc, digit| acc * 10 + u32::from(digit - b'0'));
        match char::from_u32(code_point) {
            Some(ch) => out.push(ch),
            None => return Err(Error::InvalidEncodedName(code.to_string())),
        }
    }

    if !is_path_component(&out) {
        return Err(Error::InvalidEncodedName(code.to_string()));
    }
    Ok(out)
}

/// Decode `name` if it is an encoded name, otherwise return it unchanged.
pub fn decode_name_or_literal(name: &str) -> String {
    decode_name(name).unwrap_or_else(|_| name.to_string())
}

fn is_path_component(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\0'])
}
