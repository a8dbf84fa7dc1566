use std::{error, fmt, io, path::PathBuf};

/// Everything that can stop the program before or during bootstrap.
#[derive(Debug)]
pub enum Error {
    Config(config::ConfigError),
    /// Window, instance, surface, adapter or logical device creation failed.
    Display(String),
    /// A GPU resource needed for the first frame could not be created.
    Device(String),
    ShaderRead { path: PathBuf, source: io::Error },
    /// The graphics pipeline could not be built. Logged, never fatal.
    ShaderLink(String),
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) | Error::Display(_) | Error::Device(_) | Error::ShaderLink(_) => 1,
            Error::ShaderRead { .. } => 2,
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Config(err) => write!(f, "invalid settings: {}", err),
            Error::Display(msg) => write!(f, "could not create the display: {}", msg),
            Error::Device(msg) => write!(f, "could not create GPU resources: {}", msg),
            Error::ShaderRead { path, source } => {
                write!(f, "could not read shader {}: {}", path.display(), source)
            }
            Error::ShaderLink(msg) => write!(f, "not able to link shader program: {}", msg),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Config(err) => Some(err),
            Error::ShaderRead { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub(crate) fn display_error<E: fmt::Debug>(err: E) -> Error {
    Error::Display(format!("{:?}", err))
}

pub(crate) fn device_error<E: fmt::Debug>(err: E) -> Error {
    Error::Device(format!("{:?}", err))
}
