use crate::{decode, path_guard::Rejection};

/// Schemes refused after the leading slash, matched case-insensitively.
pub const DEFAULT_DANGEROUS_SCHEMES: &[&str] = &[
    "javascript",
    "data",
    "vbscript",
    "file",
    "about",
    "blob",
    "http",
    "https",
    "ftp",
];

/// Threat checks over a fully decoded candidate. Returns the candidate with
/// tab, CR and LF removed.
pub fn scan(decoded: &str, schemes: &[String]) -> Result<String, Rejection> {
    let stripped = strip_control_characters(decoded);

    // "%\n41" turns into an escape once the newline is gone.
    if stripped != decoded && !decode::is_settled(&stripped) {
        return Err(Rejection::SplitEscape);
    }

    check_leading_slash(&stripped)?;
    check_backslash(&stripped)?;
    check_scheme(&stripped, schemes)?;
    check_residual_controls(&stripped)?;

    Ok(stripped)
}

/// Browsers drop these anywhere in a URL before parsing it.
pub fn strip_control_characters(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, '\n' | '\r' | '\t'))
        .collect()
}

pub fn check_leading_slash(value: &str) -> Result<(), Rejection> {
    if value.starts_with("//") {
        Err(Rejection::ProtocolRelative)
    } else if value.starts_with('/') {
        Ok(())
    } else {
        Err(Rejection::NotRelative)
    }
}

pub fn check_backslash(value: &str) -> Result<(), Rejection> {
    if value.contains('\\') {
        return Err(Rejection::Backslash);
    }
    Ok(())
}

pub fn check_scheme(value: &str, schemes: &[String]) -> Result<(), Rejection> {
    let rest = value.strip_prefix('/').unwrap_or(value);

    for scheme in schemes {
        let Some(head) = rest.get(..scheme.len()) else {
            continue;
        };
        if head.eq_ignore_ascii_case(scheme) && rest.as_bytes().get(scheme.len()) == Some(&b':') {
            return Err(Rejection::DangerousScheme(scheme.clone()));
        }
    }

    Ok(())
}

pub fn check_residual_controls(value: &str) -> Result<(), Rejection> {
    if value.chars().any(char::is_control) {
        return Err(Rejection::ControlCharacter);
    }
    Ok(())
}
