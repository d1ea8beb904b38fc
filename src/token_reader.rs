use std::collections::HashMap;

use crate::error::fragment;
use crate::{DecodeError, DecodeResult, OAUTH_TOKEN_KEY, OAUTH_TOKEN_SECRET_KEY};

/// Parses an `application/x-www-form-urlencoded` response into a flat map.
///
/// Every non-empty segment has to be a `key=value` pair; later keys win.
pub(crate) fn read_token_map(text: &str) -> DecodeResult<HashMap<String, String>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(DecodeError::MalformedPair(String::new()));
    }
    if let Some(bad) = trimmed
        .split('&')
        .find(|segment| !segment.is_empty() && !segment.contains('='))
    {
        return Err(DecodeError::MalformedPair(fragment(bad)));
    }
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(trimmed)
        .map_err(|_| DecodeError::MalformedPair(fragment(trimmed)))?;
    Ok(pairs.into_iter().collect())
}

/// Checks that an access token exchange produced both halves of the token.
pub(crate) fn require_token_pair(map: &HashMap<String, String>, text: &str) -> DecodeResult<()> {
    match (map.get(OAUTH_TOKEN_KEY), map.get(OAUTH_TOKEN_SECRET_KEY)) {
        (Some(_), Some(_)) => Ok(()),
        (None, _) => Err(DecodeError::TokenKeyNotFound(OAUTH_TOKEN_KEY, fragment(text))),
        (_, None) => Err(DecodeError::TokenKeyNotFound(
            OAUTH_TOKEN_SECRET_KEY,
            fragment(text),
        )),
    }
}
