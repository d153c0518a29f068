use crate::config::BadgeConfig;

/// Path marker that identifies admin/editor preview URLs. Everything from the
/// marker onward is dropped so the public site root gets measured instead.
const ADMIN_PATH_MARKER: &str = "wp-admin";

/// Canonical percent-encoded URL used as both cache key and API parameter.
/// Always ends in an (encoded) trailing slash.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedUrl(String);

impl ResolvedUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decoded form, for display. Falls back to the encoded form if the
    /// stored value is not valid percent-encoding.
    pub fn decoded(&self) -> String {
        urlencoding::decode(&self.0)
            .map(|c| c.into_owned())
            .unwrap_or_else(|_| self.0.clone())
    }
}

impl std::fmt::Display for ResolvedUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Determine the URL to measure. Pure and infallible: every input, including
/// empty and malformed ones, maps to some deterministic ResolvedUrl.
pub fn resolve(config: &BadgeConfig, current_location: &str) -> ResolvedUrl {
    let base = if config.use_custom_url && !config.custom_url_to_check.is_empty() {
        // The custom URL is stored percent-encoded; a value that fails to
        // decode is used verbatim.
        match urlencoding::decode(&config.custom_url_to_check) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => config.custom_url_to_check.clone(),
        }
    } else {
        current_location.to_string()
    };

    let base = match base.find(ADMIN_PATH_MARKER) {
        Some(idx) => &base[..idx],
        None => base.as_str(),
    };

    let with_slash = if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{}/", base)
    };

    ResolvedUrl(urlencoding::encode(&with_slash).into_owned())
}
