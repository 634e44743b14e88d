// SPDX-License-Identifier: MPL-2.0

use std::{fmt, io, path::PathBuf};

/// Why an animation could not be decoded.
#[derive(Debug)]
#[non_exhaustive]
pub enum DecodeError {
    Io(io::Error),
    Format(gif::DecodingError),
    NoFrames,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "{e}"),
            Self::Format(e) => write!(f, "malformed gif: {e}"),
            Self::NoFrames => f.write_str("animation has no frames"),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Format(e) => Some(e),
            Self::NoFrames => None,
        }
    }
}

impl From<io::Error> for DecodeError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<gif::DecodingError> for DecodeError {
    fn from(e: gif::DecodingError) -> Self {
        match e {
            gif::DecodingError::Io(e) => Self::Io(e),
            e => Self::Format(e),
        }
    }
}

/// Top-level playback error.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    Decode { path: PathBuf, source: DecodeError },
    NotADirectory(PathBuf),
    EmptyDirectory(PathBuf),
    NoReadableAnimations(PathBuf),
    Deadline(calloop::Error),
}

impl Error {
    pub fn decode(path: impl Into<PathBuf>, source: impl Into<DecodeError>) -> Self {
        Self::Decode {
            path: path.into(),
            source: source.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode { path, source } => {
                write!(f, "gif at {} is not readable: {source}", path.display())
            }
            Self::NotADirectory(path) => write!(f, "{} is not a directory", path.display()),
            Self::EmptyDirectory(path) => write!(f, "gif directory {} is empty", path.display()),
            Self::NoReadableAnimations(path) => write!(
                f,
                "no files in {} were readable gifs",
                path.display()
            ),
            Self::Deadline(e) => write!(f, "cannot arm slide deadline: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Decode { source, .. } => Some(source),
            Self::Deadline(e) => Some(e),
            _ => None,
        }
    }
}
