use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;

/// Placeholder secret shipped in sample env files; never accepted as a real secret
pub const PLACEHOLDER_SECRET: &str = "secret";

pub const DEFAULT_JWT_TTL_SECONDS: i64 = 1200;

/// Longest accepted token lifetime: one year
pub const MAX_JWT_TTL_SECONDS: i64 = 365 * 24 * 60 * 60;

/// Longest accepted render budget: ten minutes
pub const MAX_RENDER_TIMEOUT_MS: u64 = 10 * 60 * 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub auth: AuthConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(skip_serializing, default)]
    pub jwt_secret: String,
    pub secret_source: SecretSource,
    pub jwt_ttl_seconds: i64,
    pub cookie_secure: bool,
    pub cookie_domain: Option<String>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret_length", &self.jwt_secret.len())
            .field("secret_source", &self.secret_source)
            .field("jwt_ttl_seconds", &self.jwt_ttl_seconds)
            .field("cookie_secure", &self.cookie_secure)
            .field("cookie_domain", &self.cookie_domain)
            .finish()
    }
}

/// Limits applied to every page-body evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub timeout_ms: u64,
    pub max_steps: u64,
    pub max_output_bytes: usize,
}

/// Where the signing secret came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecretSource {
    Explicit,
    Environment,
    Fallback,
}

/// Pick the signing secret: explicit value, then `JWT_SECRET`, then the
/// well-known fallback. Candidates are trimmed; empty values and the
/// placeholder are skipped.
pub fn resolve_secret(explicit: Option<&str>, from_env: Option<&str>) -> (String, SecretSource) {
    let candidates = [
        (explicit, SecretSource::Explicit),
        (from_env, SecretSource::Environment),
    ];

    for (candidate, source) in candidates {
        let candidate = candidate.unwrap_or("").trim();
        if !candidate.is_empty() && candidate != PLACEHOLDER_SECRET {
            return (candidate.to_string(), source);
        }
    }

    (PLACEHOLDER_SECRET.to_string(), SecretSource::Fallback)
}

/// Token lifetime: explicit non-zero value, then `JWT_TTL_SECONDS`, then 1200.
/// Capped at [`MAX_JWT_TTL_SECONDS`].
pub fn resolve_ttl(explicit: Option<i64>, from_env: Option<&str>) -> i64 {
    let ttl = explicit.filter(|t| *t > 0).or_else(|| {
        from_env
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|t| *t > 0)
    });
    ttl.unwrap_or(DEFAULT_JWT_TTL_SECONDS).min(MAX_JWT_TTL_SECONDS)
}

/// `RENDER_TIMEOUT_MS`: unparsable values keep `current`, large ones are capped
pub fn resolve_render_timeout(from_env: &str, current: u64) -> u64 {
    from_env
        .trim()
        .parse::<u64>()
        .unwrap_or(current)
        .min(MAX_RENDER_TIMEOUT_MS)
}

impl AuthConfig {
    pub fn from_env() -> Self {
        let (jwt_secret, secret_source) =
            resolve_secret(None, env::var("JWT_SECRET").ok().as_deref());

        Self {
            jwt_secret,
            secret_source,
            jwt_ttl_seconds: resolve_ttl(None, env::var("JWT_TTL_SECONDS").ok().as_deref()),
            cookie_secure: env::var("COOKIE_SECURE").as_deref() == Ok("true"),
            cookie_domain: env::var("COOKIE_DOMAIN").ok().filter(|d| !d.trim().is_empty()),
        }
    }

    /// Build with an explicit secret and lifetime, falling back to the environment
    pub fn with_secret(secret: Option<&str>, ttl_seconds: Option<i64>) -> Self {
        let (jwt_secret, secret_source) =
            resolve_secret(secret, env::var("JWT_SECRET").ok().as_deref());

        Self {
            jwt_secret,
            secret_source,
            jwt_ttl_seconds: resolve_ttl(ttl_seconds, env::var("JWT_TTL_SECONDS").ok().as_deref()),
            cookie_secure: false,
            cookie_domain: None,
        }
    }

    pub fn uses_fallback_secret(&self) -> bool {
        self.secret_source == SecretSource::Fallback
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Render overrides
        if let Ok(v) = env::var("RENDER_TIMEOUT_MS") {
            self.render.timeout_ms = resolve_render_timeout(&v, self.render.timeout_ms);
        }
        if let Ok(v) = env::var("RENDER_MAX_STEPS") {
            self.render.max_steps = v.parse().unwrap_or(self.render.max_steps);
        }
        if let Ok(v) = env::var("RENDER_MAX_OUTPUT_BYTES") {
            self.render.max_output_bytes = v.parse().unwrap_or(self.render.max_output_bytes);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                max_connections: 10,
                connection_timeout: 30,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["*".to_string()],
            },
            auth: AuthConfig::from_env(),
            render: RenderConfig {
                timeout_ms: 5_000,
                max_steps: 200_000,
                max_output_bytes: 4 * 1024 * 1024, // 4MB
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                max_connections: 20,
                connection_timeout: 10,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["*".to_string()],
            },
            auth: AuthConfig::from_env(),
            render: RenderConfig {
                timeout_ms: 3_000,
                max_steps: 100_000,
                max_output_bytes: 2 * 1024 * 1024, // 2MB
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout: 5,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["*".to_string()],
            },
            auth: AuthConfig::from_env(),
            render: RenderConfig {
                timeout_ms: 2_000,
                max_steps: 100_000,
                max_output_bytes: 2 * 1024 * 1024, // 2MB
            },
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 2_000,
            max_steps: 100_000,
            max_output_bytes: 2 * 1024 * 1024,
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

/// Listen port: `VEMPAIN_PORT`, then `PORT`, then 8080
pub fn server_port() -> u16 {
    env::var("VEMPAIN_PORT")
        .ok()
        .or_else(|| env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(8080)
}

#[macro_export]
macro_rules! is_development {
    () => {
        matches!(
            $crate::config::CONFIG.environment,
            $crate::config::Environment::Development
        )
    };
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!(
            $crate::config::CONFIG.environment,
            $crate::config::Environment::Production
        )
    };
}
