use std::collections::HashSet;

use crate::{
    decode::{self, DEFAULT_DECODE_PASSES},
    normalize::{normalize_path, split_target},
    scan::{self, DEFAULT_DANGEROUS_SCHEMES},
};

/// Why a candidate was refused. Only ever surfaces in logs and tests; callers
/// of the public API see `None`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub(crate) enum Rejection {
    #[error("empty input")]
    Empty,
    #[error("input longer than {max} bytes")]
    TooLong { max: usize },
    #[error("percent-encoding nested deeper than the decode budget")]
    EncodingTooDeep,
    #[error("control characters split a percent escape")]
    SplitEscape,
    #[error("not a relative path")]
    NotRelative,
    #[error("protocol-relative prefix")]
    ProtocolRelative,
    #[error("backslash in target")]
    Backslash,
    #[error("dangerous scheme `{0}`")]
    DangerousScheme(String),
    #[error("control character in target")]
    ControlCharacter,
    #[error("path is on the disallow list")]
    Disallowed,
    #[error("normalized target still carries decodable escapes")]
    PendingEscape,
}

impl Rejection {
    pub(crate) fn code(&self) -> &'static str {
        match self {
            Rejection::Empty => "empty",
            Rejection::TooLong { .. } => "too_long",
            Rejection::EncodingTooDeep => "encoding_too_deep",
            Rejection::SplitEscape => "split_escape",
            Rejection::NotRelative => "not_relative",
            Rejection::ProtocolRelative => "protocol_relative",
            Rejection::Backslash => "backslash",
            Rejection::DangerousScheme(_) => "dangerous_scheme",
            Rejection::ControlCharacter => "control_character",
            Rejection::Disallowed => "disallowed",
            Rejection::PendingEscape => "pending_escape",
        }
    }
}

/// Rules applied to untrusted post-login redirect targets.
#[derive(Debug, Clone)]
pub struct RedirectPolicy {
    disallow: HashSet<String>,
    schemes: Vec<String>,
    decode_passes: usize,
    max_length: Option<usize>,
}

impl Default for RedirectPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl RedirectPolicy {
    pub fn new() -> Self {
        Self {
            disallow: HashSet::new(),
            schemes: DEFAULT_DANGEROUS_SCHEMES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            decode_passes: DEFAULT_DECODE_PASSES,
            max_length: None,
        }
    }

    /// Replaces the set of exact paths that may never be returned.
    pub fn with_disallow<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disallow = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the dangerous scheme list.
    pub fn with_schemes<I, S>(mut self, schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schemes = Vec::new();
        self.with_extra_schemes(schemes)
    }

    pub fn with_extra_schemes<I, S>(mut self, schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for scheme in schemes {
            let scheme: String = scheme.into();
            let scheme = scheme.trim().trim_end_matches(':').to_ascii_lowercase();
            if !scheme.is_empty() && !self.schemes.contains(&scheme) {
                self.schemes.push(scheme);
            }
        }
        self
    }

    /// Clamped to at least one pass.
    pub fn with_decode_passes(mut self, passes: usize) -> Self {
        self.decode_passes = passes.max(1);
        self
    }

    pub fn with_max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn schemes(&self) -> &[String] {
        &self.schemes
    }

    pub fn decode_passes(&self) -> usize {
        self.decode_passes
    }

    pub fn max_length(&self) -> Option<usize> {
        self.max_length
    }

    /// Disallowed paths in sorted order.
    pub fn disallowed_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.disallow.iter().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }

    pub fn is_disallowed(&self, path: &str) -> bool {
        self.disallow.contains(path)
    }

    /// Returns a normalized internal path, or `None` if `input` must not be
    /// used as a redirect target. Never echo the raw input on `None`.
    pub fn sanitize(&self, input: Option<&str>) -> Option<String> {
        self.evaluate(input).ok()
    }

    pub(crate) fn evaluate(&self, input: Option<&str>) -> Result<String, Rejection> {
        let candidate = gate(input, self.max_length)?;
        let decoded = decode::decode_bounded(candidate, self.decode_passes)?;
        let scanned = scan::scan(&decoded, &self.schemes)?;

        let (path, suffix) = split_target(&scanned);
        let path = normalize_path(path);
        let target = format!("{path}{suffix}");

        // A failed decode pass leaves every escape in place, and dot segments
        // may have dropped the malformed one that made the pass fail.
        if !decode::is_settled(&path) || !decode::is_settled(&target) {
            return Err(Rejection::PendingEscape);
        }
        self.check_normalized_path(&path)?;

        Ok(target)
    }

    // Normalization can assemble a scheme (`/x/../javascript:`), and a
    // downstream router may still decode the escapes a failed pass left behind.
    fn check_normalized_path(&self, path: &str) -> Result<(), Rejection> {
        let lenient = decode::decode_lenient(path);
        scan::check_leading_slash(&lenient)?;
        scan::check_backslash(&lenient)?;
        scan::check_scheme(&lenient, &self.schemes)?;
        scan::check_residual_controls(&lenient)?;

        if self.is_disallowed(path) || self.is_disallowed(&normalize_path(&lenient)) {
            return Err(Rejection::Disallowed);
        }
        Ok(())
    }
}

/// Sanitizes a redirect target with the default policy and the given
/// disallow list.
pub fn sanitize_redirect_path<S: AsRef<str>>(
    input: Option<&str>,
    disallow: &[S],
) -> Option<String> {
    RedirectPolicy::new()
        .with_disallow(disallow.iter().map(|path| AsRef::<str>::as_ref(path)))
        .sanitize(input)
}

fn gate(input: Option<&str>, max_length: Option<usize>) -> Result<&str, Rejection> {
    let value = input.ok_or(Rejection::Empty)?;
    if value.trim().is_empty() {
        return Err(Rejection::Empty);
    }
    if let Some(max) = max_length
        && value.len() > max
    {
        return Err(Rejection::TooLong { max });
    }
    Ok(value)
}
