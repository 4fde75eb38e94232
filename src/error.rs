use thiserror::Error;

#[derive(Error, Debug)]
pub enum ElectionError {
    #[error("Ports are busy: no free port in {host}:{min_port} (+{count})")]
    PortsBusy {
        host: String,
        min_port: u16,
        count: u16,
    },

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Listener failed: {0}")]
    Serve(#[source] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, ElectionError>;
