use tower_sessions::{cookie::SameSite, Expiry, SessionManagerLayer, SessionStore};

use crate::config::SessionConfig;

/// Build the cookie-session middleware for `store` from configuration.
pub fn session_layer<S: SessionStore + Clone>(
    store: S,
    config: &SessionConfig,
) -> SessionManagerLayer<S> {
    SessionManagerLayer::new(store)
        .with_name(config.cookie_name.clone())
        .with_path(config.cookie_path.clone())
        .with_secure(config.secure)
        .with_http_only(config.http_only)
        .with_same_site(same_site(&config.same_site))
        .with_expiry(Expiry::OnInactivity(time::Duration::seconds(
            config.expiry_secs,
        )))
}

/// Validation already restricts the value; anything else falls back to `Lax`.
fn same_site(value: &str) -> SameSite {
    match value.to_ascii_lowercase().as_str() {
        "strict" => SameSite::Strict,
        "none" => SameSite::None,
        _ => SameSite::Lax,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_site_mapping() {
        assert_eq!(same_site("Strict"), SameSite::Strict);
        assert_eq!(same_site("none"), SameSite::None);
        assert_eq!(same_site("lax"), SameSite::Lax);
    }
}
