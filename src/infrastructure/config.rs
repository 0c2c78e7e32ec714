use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    pub cors: CorsConfig,
    pub cron: CronConfig,
    pub depletion: DepletionConfig,
    pub variance: VarianceConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

/// Shared-secret gate for the `/cron/*` endpoints (§4.5 auto-close, §4.9
/// alert evaluation) that an external scheduler calls on a timer rather
/// than a human through the UI.
#[derive(Debug, Clone)]
pub struct CronConfig {
    pub shared_secret: String,
}

/// Tuning for `application::depletion_service` batch ingestion (§4.3, §4.4).
#[derive(Debug, Clone)]
pub struct DepletionConfig {
    pub batch_size: usize,
}

/// Default variance threshold applied when a business has not overridden
/// `BusinessSettings.default_variance_threshold_pct` (§4.6).
#[derive(Debug, Clone)]
pub struct VarianceConfig {
    pub default_threshold_pct: f64,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")?,
            },
            server: ServerConfig {
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()?,
            },
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET")?,
                issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "barstock".to_string()),
                access_token_ttl_minutes: env::var("ACCESS_TOKEN_TTL_MINUTES")
                    .unwrap_or_else(|_| "15".to_string())
                    .parse()?,
                refresh_token_ttl_days: env::var("REFRESH_TOKEN_TTL_DAYS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()?,
            },
            cors: CorsConfig {
                allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| "http://localhost:3000".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect(),
            },
            cron: CronConfig {
                shared_secret: env::var("CRON_SHARED_SECRET")
                    .unwrap_or_else(|_| "change_me".to_string()),
            },
            depletion: DepletionConfig {
                batch_size: env::var("DEPLETION_BATCH_SIZE")
                    .unwrap_or_else(|_| "10000".to_string())
                    .parse()?,
            },
            variance: VarianceConfig {
                default_threshold_pct: env::var("DEFAULT_VARIANCE_THRESHOLD_PCT")
                    .unwrap_or_else(|_| "10.0".to_string())
                    .parse()?,
            },
        })
    }

    pub fn server_address(&self) -> String {
        format!("0.0.0.0:{}", self.server.port)
    }
}
