use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    /// How recent an agent heartbeat must be to count as online, seconds.
    pub presence_window_secs: i64,
    /// External assistant generation endpoint. When unset the router falls
    /// back to the static apology for every assistant turn.
    pub assistant_endpoint: Option<String>,
    pub assistant_timeout_secs: u64,
    pub event_bus_capacity: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://supportline.db?mode=rwc".to_string());

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let presence_window_secs = env::var("PRESENCE_WINDOW_SECS")
            .unwrap_or_else(|_| "120".to_string())
            .parse()
            .unwrap_or(120);

        let assistant_endpoint = env::var("ASSISTANT_ENDPOINT").ok();

        let assistant_timeout_secs = env::var("ASSISTANT_TIMEOUT_SECS")
            .unwrap_or_else(|_| "20".to_string())
            .parse()
            .unwrap_or(20);

        let event_bus_capacity = env::var("EVENT_BUS_CAPACITY")
            .unwrap_or_else(|_| "1000".to_string())
            .parse()
            .unwrap_or(1000);

        Ok(Config {
            database_url,
            server_host,
            server_port,
            presence_window_secs,
            assistant_endpoint,
            assistant_timeout_secs,
            event_bus_capacity,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid port number")]
    InvalidPort,
}
