use regex::Regex;

use super::error::ProbeError;

/// Returns the first capture group of `regex` in `url`.
pub(crate) fn capture_group_1<'a>(regex: &Regex, url: &'a str) -> Result<&'a str, ProbeError> {
    regex
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| ProbeError::InvalidUrl(url.to_string()))
}
