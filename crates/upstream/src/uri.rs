//! URI helpers

use url::Url;

/// Hide the password part of a URI before it is logged.
///
/// Strings that do not parse as URIs are returned unchanged.
pub fn sanitize_uri(uri: &str) -> String {
    match Url::parse(uri) {
        Ok(mut parsed) if parsed.password().is_some() => {
            if parsed.set_password(Some("xxx")).is_err() {
                return uri.to_string();
            }
            parsed.to_string()
        }
        _ => uri.to_string(),
    }
}
