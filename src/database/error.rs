use std::fmt::{self, Display};

use potion::Error;
use warp::reject::Rejection;

use crate::{
    constants::{
        INGREDIENT_LINE_CONSTRAINT, SELF_FOLLOW_CONSTRAINT, TAG_SLUG_CONSTRAINT,
        USER_EMAIL_CONSTRAINT, USER_USERNAME_CONSTRAINT,
    },
    schema::RelationKind,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    AlreadyExists,
    SelfReference,
    Forbidden,
    Storage,
}

impl ErrorKind {
    pub fn new(self, info: &str) -> CoreError {
        CoreError {
            kind: self,
            info: info.to_string(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::NotFound => "not_found",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::SelfReference => "self_reference",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Storage => "storage_error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreError {
    kind: ErrorKind,
    info: String,
}

impl CoreError {
    pub fn new(kind: ErrorKind, info: String) -> Self {
        Self { kind, info }
    }

    pub fn storage(info: String) -> Self {
        log::error!("Storage failure: {info}");
        Self::new(ErrorKind::Storage, info)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn info(&self) -> &str {
        &self.info
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

impl Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.info)
    }
}

impl std::error::Error for CoreError {}

/// Maps a violated storage constraint to the domain error a caller would have
/// received from the application-level pre-check.
pub fn constraint_error(
    kind: sqlx::error::ErrorKind,
    constraint: Option<&str>,
    info: String,
) -> CoreError {
    use sqlx::error::ErrorKind as DbKind;

    match (kind, constraint) {
        (DbKind::UniqueViolation, Some(INGREDIENT_LINE_CONSTRAINT)) => {
            ErrorKind::Validation.new("duplicate ingredient")
        }
        (DbKind::UniqueViolation, Some(TAG_SLUG_CONSTRAINT)) => {
            ErrorKind::AlreadyExists.new("Tag with this slug already exists")
        }
        (DbKind::UniqueViolation, Some(USER_EMAIL_CONSTRAINT)) => {
            ErrorKind::AlreadyExists.new("User with this email already exists")
        }
        (DbKind::UniqueViolation, Some(USER_USERNAME_CONSTRAINT)) => {
            ErrorKind::AlreadyExists.new("User with this username already exists")
        }
        (DbKind::UniqueViolation, Some(name)) => match RelationKind::from_constraint(name) {
            Some(relation) => ErrorKind::AlreadyExists.new(relation.already_exists_message()),
            None => CoreError::new(ErrorKind::AlreadyExists, info),
        },
        (DbKind::UniqueViolation, None) => CoreError::new(ErrorKind::AlreadyExists, info),
        (DbKind::CheckViolation, Some(SELF_FOLLOW_CONSTRAINT)) => {
            ErrorKind::SelfReference.new("You can't subscribe to yourself")
        }
        (DbKind::CheckViolation, _) | (DbKind::NotNullViolation, _) => {
            CoreError::new(ErrorKind::Validation, info)
        }
        (DbKind::ForeignKeyViolation, _) => CoreError::new(ErrorKind::NotFound, info),
        _ => CoreError::storage(info),
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) => {
                constraint_error(e.kind(), e.constraint(), format!("{e}"))
            }
            sqlx::Error::RowNotFound => ErrorKind::NotFound.new("RowNotFound"),
            sqlx::Error::Configuration(e) => Self::storage(format!("{e}")),
            sqlx::Error::Io(e) => Self::storage(format!("{e}")),
            sqlx::Error::Tls(e) => Self::storage(format!("{e}")),
            sqlx::Error::Protocol(e) => Self::storage(format!("{e}")),
            sqlx::Error::TypeNotFound { type_name } => {
                Self::storage(format!("Type not found: {type_name}"))
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => {
                Self::storage(format!("Column index out of bounds {index} ({len})"))
            }
            sqlx::Error::ColumnNotFound(e) => Self::storage(format!("{e}")),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::storage(format!("Column decode {index} ({source})"))
            }
            sqlx::Error::Decode(e) => Self::storage(format!("{e}")),
            sqlx::Error::PoolTimedOut => Self::storage(format!("Pool timed out")),
            sqlx::Error::PoolClosed => Self::storage(format!("Pool closed")),
            sqlx::Error::WorkerCrashed => Self::storage(format!("Worker crashed")),
            sqlx::Error::Migrate(e) => Self::storage(format!("{e}")),
            _ => Self::storage(format!("Unknown error")),
        }
    }
}

impl Into<Error> for CoreError {
    fn into(self) -> Error {
        let code = match self.kind {
            ErrorKind::Validation | ErrorKind::AlreadyExists | ErrorKind::SelfReference => 400,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Storage => 500,
        };

        Error {
            code,
            info: Some(self.info),
            redirect: None,
        }
    }
}

impl Into<Rejection> for CoreError {
    fn into(self) -> Rejection {
        let error: Error = self.into();
        error.into()
    }
}

#[derive(Debug)]
pub struct ConfigError {
    info: String,
}

impl ConfigError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for ConfigError {}
