use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    #[error("No stack samples in {0}")]
    EmptyProfile(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Loader error: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const INVALID_ARGUMENTS: i32 = 2;
    pub const PROFILE_NOT_FOUND: i32 = 3;
    pub const EMPTY_PROFILE: i32 = 4;
    pub const DATABASE_ERROR: i32 = 6;
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::ProfileNotFound(_) => exit_code::PROFILE_NOT_FOUND,
            Error::EmptyProfile(_) => exit_code::EMPTY_PROFILE,
            Error::Database(_) => exit_code::DATABASE_ERROR,
            Error::InvalidArgument(_) => exit_code::INVALID_ARGUMENTS,
            _ => exit_code::GENERAL_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            Error::InvalidArgument("x".into()).exit_code(),
            exit_code::INVALID_ARGUMENTS
        );
        assert_eq!(
            Error::Worker("gone".into()).exit_code(),
            exit_code::GENERAL_ERROR
        );
        assert_eq!(
            Error::Database(rusqlite::Error::QueryReturnedNoRows).exit_code(),
            exit_code::DATABASE_ERROR
        );
    }
}
