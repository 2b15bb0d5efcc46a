//! Marker + Base64 de-obfuscation of TVBox configs
//!
//! Some providers hide the real config after an 8 character alphanumeric token
//! followed by `**`, typically appended to an image so the url serves a
//! picture to browsers. Everything after the first marker is Base64.
//!
//! Decoding is advisory: a marker that turns out to be a false positive leaves
//! the body untouched.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;
use tracing::debug;

use crate::errors::{SourceError, SourceResult};

static MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9]{8}\*\*").expect("valid marker regex"));

/// Return the hidden payload if `content` carries one, else `content` itself
///
/// Bodies without a marker are returned borrowed and unchanged, so applying
/// this to already decoded content is a no-op.
pub fn resolve_obfuscated(content: &str) -> Cow<'_, str> {
    let Some(marker) = MARKER.find(content) else {
        return Cow::Borrowed(content);
    };

    match decode_payload(&content[marker.end()..]) {
        Ok(decoded) => {
            debug!(
                "Decoded obfuscated payload at offset {} ({} bytes)",
                marker.start(),
                decoded.len()
            );
            Cow::Owned(decoded)
        }
        Err(e) => {
            debug!("Ignoring obfuscation marker at offset {}: {}", marker.start(), e);
            Cow::Borrowed(content)
        }
    }
}

/// Base64-decode the text after a marker; the result must look like JSON
fn decode_payload(payload: &str) -> SourceResult<String> {
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| SourceError::DecodeFailed {
            message: format!("invalid base64 payload: {e}"),
        })?;

    let decoded = String::from_utf8(bytes).map_err(|e| SourceError::DecodeFailed {
        message: format!("payload is not UTF-8: {e}"),
    })?;

    let trimmed = decoded.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        Ok(decoded)
    } else {
        Err(SourceError::DecodeFailed {
            message: "decoded payload is not JSON".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn obfuscate(prefix: &str, payload: &str) -> String {
        format!("{prefix}Ab3dE6gH**{}", STANDARD.encode(payload))
    }

    #[test]
    fn test_decodes_hidden_config() {
        let hidden = r#"{"lives":[{"url":"http://x/live.txt"}]}"#;
        let content = obfuscate("\u{fffd}PNG junk bytes ", hidden);
        assert_eq!(resolve_obfuscated(&content), hidden);
    }

    #[test]
    fn test_payload_is_trimmed() {
        let hidden = "[1,2,3]";
        let content = format!("Ab3dE6gH**\n  {}  \n", STANDARD.encode(hidden));
        assert_eq!(resolve_obfuscated(&content), hidden);
    }

    #[test]
    fn test_false_positive_marker_keeps_content() {
        let content = "#EXTM3U\n#EXTINF:-1,Promo12345678**special\nhttp://a/b.m3u8";
        assert!(matches!(resolve_obfuscated(content), Cow::Borrowed(c) if c == content));
    }

    #[test]
    fn test_non_json_payload_keeps_content() {
        let content = obfuscate("", "plain text, not a config");
        assert_eq!(resolve_obfuscated(&content), content.as_str());
    }

    #[test]
    fn test_idempotent_on_decoded_output() {
        let hidden = r#"{"lives":[]}"#;
        let once = resolve_obfuscated(&obfuscate("x", hidden)).into_owned();
        assert_eq!(resolve_obfuscated(&once), once.as_str());
    }

    proptest! {
        #[test]
        fn prop_no_marker_is_no_op(content in "[^*]{0,200}") {
            let resolved = resolve_obfuscated(&content);
            prop_assert!(matches!(resolved, Cow::Borrowed(_)));
            prop_assert_eq!(&*resolved, content.as_str());
        }
    }
}
