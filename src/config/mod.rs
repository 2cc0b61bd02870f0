use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub identity: IdentityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub enable_query_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub default_page_limit: i64,
    pub max_page_limit: i64,
    pub enable_request_logging: bool,
    /// Physical row removal. Never enabled by the production preset.
    pub allow_hard_delete: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_issuer: Option<String>,
    pub jwt_expiry_hours: u64,
    pub admin_group: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Base URL of the identity provider's admin API. `None` leaves identity sync unconfigured.
    pub base_url: Option<String>,
    pub user_pool_id: String,
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
    pub agent_group: String,
    pub timeout_secs: u64,
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

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_ENABLE_QUERY_LOGGING") {
            self.database.enable_query_logging = v.parse().unwrap_or(self.database.enable_query_logging);
        }

        // API overrides
        if let Ok(v) = env::var("PORT") {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }
        if let Ok(v) = env::var("API_DEFAULT_PAGE_LIMIT") {
            self.api.default_page_limit = v.parse().unwrap_or(self.api.default_page_limit);
        }
        if let Ok(v) = env::var("API_MAX_PAGE_LIMIT") {
            self.api.max_page_limit = v.parse().unwrap_or(self.api.max_page_limit);
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        // Hard delete can be switched off anywhere but never switched on in production
        if let Ok(v) = env::var("API_ALLOW_HARD_DELETE") {
            let requested = v.parse().unwrap_or(self.api.allow_hard_delete);
            self.api.allow_hard_delete = requested && self.environment != Environment::Production;
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("JWT_ISSUER") {
            self.security.jwt_issuer = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_ADMIN_GROUP") {
            self.security.admin_group = v;
        }

        // Identity provider overrides
        if let Ok(v) = env::var("IDENTITY_BASE_URL") {
            self.identity.base_url = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("IDENTITY_USER_POOL_ID") {
            self.identity.user_pool_id = v;
        }
        if let Ok(v) = env::var("IDENTITY_API_TOKEN") {
            self.identity.api_token = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("IDENTITY_AGENT_GROUP") {
            self.identity.agent_group = v;
        }
        if let Ok(v) = env::var("IDENTITY_TIMEOUT_SECS") {
            self.identity.timeout_secs = v.parse().unwrap_or(self.identity.timeout_secs);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
                enable_query_logging: true,
            },
            api: ApiConfig {
                port: 8080,
                default_page_limit: 20,
                max_page_limit: 40,
                enable_request_logging: true,
                allow_hard_delete: true,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                jwt_secret: String::new(),
                jwt_issuer: None,
                jwt_expiry_hours: 24,
                admin_group: "admin".to_string(),
            },
            identity: IdentityConfig::defaults(),
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
                enable_query_logging: true,
            },
            api: ApiConfig {
                port: 8080,
                default_page_limit: 20,
                max_page_limit: 40,
                enable_request_logging: true,
                allow_hard_delete: true,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
                jwt_secret: String::new(),
                jwt_issuer: None,
                jwt_expiry_hours: 4,
                admin_group: "admin".to_string(),
            },
            identity: IdentityConfig::defaults(),
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
                enable_query_logging: false,
            },
            api: ApiConfig {
                port: 8080,
                default_page_limit: 20,
                max_page_limit: 40,
                enable_request_logging: false,
                allow_hard_delete: false,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
                jwt_secret: String::new(),
                jwt_issuer: None,
                jwt_expiry_hours: 1,
                admin_group: "admin".to_string(),
            },
            identity: IdentityConfig::defaults(),
        }
    }
}

impl IdentityConfig {
    fn defaults() -> Self {
        Self {
            base_url: None,
            user_pool_id: String::new(),
            api_token: None,
            agent_group: "agent".to_string(),
            timeout_secs: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert!(config.api.allow_hard_delete);
        assert_eq!(config.api.default_page_limit, 20);
        assert_eq!(config.api.max_page_limit, 40);
        assert_eq!(config.security.admin_group, "admin");
        assert_eq!(config.identity.agent_group, "agent");
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(config.is_production());
        assert!(!config.api.allow_hard_delete);
        assert!(!config.database.enable_query_logging);
    }

    #[test]
    fn test_secrets_are_not_serialized() {
        let mut config = AppConfig::development();
        config.security.jwt_secret = "super-secret".to_string();
        config.identity.api_token = Some("token".to_string());

        let rendered = serde_json::to_string(&config).unwrap();
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("\"token\""));
    }
}
