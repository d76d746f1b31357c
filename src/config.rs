use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Password reset delivery and lifetime settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ResetConfig {
    /// Base of the link handed to the user, e.g. `https://host/reset`.
    pub url_prefix: String,
    /// Page appended after the token in the reset link.
    pub page: String,
    /// `None` keeps tokens valid until redeemed or superseded.
    pub max_age_minutes: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub reset: ResetConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "passgate".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "passgate-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
        };
        let reset = ResetConfig {
            url_prefix: std::env::var("RESET_URL_PREFIX")
                .unwrap_or_else(|_| "http://localhost:8080/reset".into()),
            page: std::env::var("RESET_PAGE").unwrap_or_else(|_| "reset.html".into()),
            max_age_minutes: std::env::var("RESET_TOKEN_MAX_AGE_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .filter(|m| *m > 0),
        };
        Ok(Self {
            database_url,
            jwt,
            reset,
        })
    }

    pub fn reset_max_age(&self) -> Option<time::Duration> {
        self.reset.max_age_minutes.map(time::Duration::minutes)
    }
}
