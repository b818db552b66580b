use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("bind error: {0}")]
    Io(#[from] std::io::Error),
}
