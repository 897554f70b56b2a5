use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("telemetry setup failed: {0}")]
    Telemetry(String),
}
