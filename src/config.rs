use std::{env, fmt, net::SocketAddr, str::FromStr, time::Duration};

#[derive(Debug)]
pub struct ConfigError {
    info: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.info)
    }
}

impl std::error::Error for ConfigError {}

/// Server settings read from the environment
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: SocketAddr,
    pub secret_key: Vec<u8>,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let secret_key = var("SECRET_KEY").ok_or_else(|| ConfigError {
            info: String::from("SECRET_KEY must be set"),
        })?;

        Ok(Self {
            database_url: var("DATABASE_URL").ok_or_else(|| ConfigError {
                info: String::from("DATABASE_URL must be set"),
            })?,
            bind_address: try_load("BIND_ADDRESS", "0.0.0.0:8000")?,
            secret_key: secret_key.into_bytes(),
            max_connections: try_load("DATABASE_MAX_CONNECTIONS", "5")?,
            acquire_timeout: Duration::from_secs(try_load("DATABASE_ACQUIRE_TIMEOUT", "30")?),
        })
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    let value = var(key).unwrap_or_else(|| {
        log::info!("{key} not set, using default: {default}");
        default.to_string()
    });

    value.trim().parse().map_err(|e| ConfigError {
        info: format!("Invalid {key} value '{value}': {e}"),
    })
}
