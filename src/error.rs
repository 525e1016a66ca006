/// Main error type for the library.
#[derive(Debug)]
pub enum Error {
    /// The depth frame has no valid sample.
    EmptyRange,
    /// The depth range collapses into a single value (min == max).
    DegenerateRange,
    /// The rendering backend could not allocate or draw.
    ResourceExhaustion(String),
    /// Depth/color/intrinsics sizes or formats do not agree.
    MalformedFrame(String),
    /// Used when the user pass a logical invalid parameter to a function.
    InvalidParameter(String),
    Io(std::io::Error),
    Parser(String),
    Image(image::ImageError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::EmptyRange => write!(f, "Empty range: frame has no valid depth sample"),
            Error::DegenerateRange => write!(f, "Degenerate range: min depth equals max depth"),
            Error::ResourceExhaustion(err) => write!(f, "Resource exhaustion: {}", err),
            Error::MalformedFrame(err) => write!(f, "Malformed frame: {}", err),
            Error::InvalidParameter(err) => write!(f, "Parameter error: {}", err),
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Parser(err) => write!(f, "Parser error: {}", err),
            Error::Image(err) => write!(f, "Image error: {}", err),
        }
    }
}

impl Error {
    /// Create a error with the kind `InvalidParameter`.
    /// # Arguments
    /// * `msg` - The error message.
    pub fn invalid_parameter<T: ToString>(msg: T) -> Self {
        Error::InvalidParameter(msg.to_string())
    }

    /// Create a error with the kind `MalformedFrame`.
    pub fn malformed_frame<T: ToString>(msg: T) -> Self {
        Error::MalformedFrame(msg.to_string())
    }

    /// Create a error with the kind `ResourceExhaustion`.
    pub fn resource_exhaustion<T: ToString>(msg: T) -> Self {
        Error::ResourceExhaustion(msg.to_string())
    }

    /// Whether the error only means the frame should be skipped, the render loop can go on.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::EmptyRange
                | Error::DegenerateRange
                | Error::MalformedFrame(_)
                | Error::ResourceExhaustion(_)
        )
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Image(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parser(err.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Image(err)
    }
}
