use std::fmt;

/// Errors surfaced by the traffic core.
///
/// Only load-time and routing-request failures are errors. A missing route between two known
/// nodes is represented as a single-node path, and agent-local problems are logged and defaulted.
#[derive(Debug)]
pub enum Error {
    /// The map data could not be turned into a usable graph.
    MalformedMapData(String),
    /// A node ID that does not exist in the graph.
    UnknownNode(String),
    /// A cached-route, OD-pair or player-trip file could not be parsed.
    MalformedRouteFile(String),
    /// The configuration file could not be parsed.
    MalformedConfig(String),
    /// A file could not be read or written.
    Io(std::io::Error),
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MalformedMapData(msg) => write!(f, "malformed map data: {msg}"),
            Error::UnknownNode(id) => write!(f, "unknown node: {id}"),
            Error::MalformedRouteFile(msg) => write!(f, "malformed route file: {msg}"),
            Error::MalformedConfig(msg) => write!(f, "malformed config: {msg}"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_names_the_node() {
        let err = Error::UnknownNode("qd66hjswu6z".into());
        assert_eq!(err.to_string(), "unknown node: qd66hjswu6z");
    }

    #[test]
    fn io_errors_keep_their_source() {
        use std::error::Error as _;
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "nodes.json").into();
        assert!(err.source().is_some());
    }
}
