use percent_encoding::percent_decode_str;

use crate::path_guard::Rejection;

pub const DEFAULT_DECODE_PASSES: usize = 3;

/// Runs at most `max_passes` percent-decoding passes over `value`.
///
/// A pass that fails (malformed triplet, invalid UTF-8) ends decoding and the
/// last good value is kept. If the budget runs out while the string is still
/// changing, the value is rejected: whatever is returned here must be a fixed
/// point for a later decode.
pub fn decode_bounded(value: &str, max_passes: usize) -> Result<String, Rejection> {
    let mut current = value.to_string();

    for _ in 0..max_passes {
        match decode_once(&current) {
            Some(next) if next != current => current = next,
            _ => return Ok(current),
        }
    }

    if is_settled(&current) {
        Ok(current)
    } else {
        Err(Rejection::EncodingTooDeep)
    }
}

/// Whether one more decoding pass would leave `value` unchanged.
pub fn is_settled(value: &str) -> bool {
    decode_once(value).is_none_or(|next| next == value)
}

/// Decodes every well-formed escape and keeps the rest literal, the way a
/// forgiving router would read the path.
pub fn decode_lenient(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}

fn decode_once(value: &str) -> Option<String> {
    if !has_well_formed_escapes(value) {
        return None;
    }
    percent_decode_str(value)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}

// percent_decode_str passes bad triplets through as literals; treat them as a
// failed pass instead.
fn has_well_formed_escapes(value: &str) -> bool {
    let bytes = value.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'%' {
            i += 1;
            continue;
        }
        match (bytes.get(i + 1), bytes.get(i + 2)) {
            (Some(hi), Some(lo)) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => i += 3,
            _ => return false,
        }
    }
    true
}
