/// Connection settings for the Realtime Database backend.
#[derive(Debug, Clone)]
pub struct RtdbConfig {
    /// Database base URL, e.g. `https://doppler-default-rtdb.firebaseio.com`.
    pub base_url: String,
    /// Optional auth credential appended as the `auth` query parameter
    /// (database secret or an ID token, depending on the rules setup).
    pub auth_token: Option<String>,
}

impl RtdbConfig {
    /// Build a config from the conventional environment variables, returning
    /// `None` when no database URL is configured.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("RTDB_URL").ok().filter(|url| !url.is_empty())?;
        let auth_token = std::env::var("RTDB_AUTH").ok().filter(|t| !t.is_empty());
        Some(Self {
            base_url,
            auth_token,
        })
    }
}
