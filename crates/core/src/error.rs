/// Result alias that carries the custom [`VizError`] type.
pub type Result<T> = std::result::Result<T, VizError>;

/// Common error type for the visualiser.
///
/// Every variant except [`VizError::Io`] and [`VizError::Json`] names the
/// initialisation stage that failed. All of them are fatal: the session
/// releases whatever was already created and the binary exits with code 1.
#[derive(Debug, thiserror::Error)]
pub enum VizError {
    /// The configuration file or command line produced an unusable setup.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Connecting to the audio server or starting the capture stream failed.
    #[error("audio capture failed: {0}")]
    Audio(String),
    /// Creating the window or its OpenGL context failed.
    #[error("presentation surface failed: {0}")]
    Surface(String),
    /// Creating the visualisation engine or its playlist failed.
    #[error("visualisation engine failed: {0}")]
    Engine(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Wrapper around configuration parse errors.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl VizError {
    pub fn config<T: Into<String>>(msg: T) -> Self {
        Self::Config(msg.into())
    }

    pub fn audio<T: Into<String>>(msg: T) -> Self {
        Self::Audio(msg.into())
    }

    pub fn surface<T: Into<String>>(msg: T) -> Self {
        Self::Surface(msg.into())
    }

    pub fn engine<T: Into<String>>(msg: T) -> Self {
        Self::Engine(msg.into())
    }
}
