//! User-Agent string sent with document and resource requests.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/markup-agent";

/// Default User-Agent (identifies the tool and its version).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("markup-agent/{version} (+{PROJECT_UA_URL})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_carries_crate_version() {
        let ua = default_user_agent();
        assert_eq!(
            ua.strip_prefix("markup-agent/")
                .and_then(|s| s.split(' ').next()),
            Some(env!("CARGO_PKG_VERSION"))
        );
        assert!(ua.contains(PROJECT_UA_URL));
    }

    #[test]
    fn test_user_agent_is_valid_header_value() {
        let ua = default_user_agent();
        assert!(reqwest::header::HeaderValue::from_str(&ua).is_ok());
    }
}
