//! Error taxonomy for the persistence layer.
//!
//! Migration failures are fatal: the application refuses to start on a
//! database it cannot bring to the current schema. Store errors split into
//! recoverable constraint violations, which callers may surface and move on
//! from, and everything else.

use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum MigrationError {
    #[error("migration {position} ({name}) failed: {source}")]
    StepFailed {
        position: usize,
        name: &'static str,
        source: rusqlite::Error,
    },

    /// The journal records more steps than this build knows. Running an old
    /// binary against a newer database is refused rather than guessed at.
    #[error("schema journal records {recorded} migrations but only {known} are known")]
    JournalAhead { recorded: usize, known: usize },

    /// A recorded name disagrees with the sequence at the same position, so
    /// the journal belongs to some other history.
    #[error("schema journal position {position} records '{recorded}', expected '{expected}'")]
    NameMismatch {
        position: usize,
        recorded: String,
        expected: &'static str,
    },

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConstraintKind {
    ForeignKey,
    NotNull,
    Unique,
    Other,
}

impl ConstraintKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            ConstraintKind::ForeignKey => "foreign key",
            ConstraintKind::NotNull => "not null",
            ConstraintKind::Unique => "unique",
            ConstraintKind::Other => "constraint",
        }
    }
}

impl std::fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("{kind} constraint violated: {message}")]
    Constraint {
        kind: ConstraintKind,
        message: String,
    },

    #[error(transparent)]
    Sqlite(rusqlite::Error),
}

impl StoreError {
    pub(crate) fn is_constraint(&self) -> bool {
        matches!(self, StoreError::Constraint { .. })
    }

    pub(crate) fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Classification happens here once; the services just use `?`.
impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ffi;

        if let rusqlite::Error::SqliteFailure(code, ref message) = err {
            if code.code == rusqlite::ErrorCode::ConstraintViolation {
                let kind = match code.extended_code {
                    ffi::SQLITE_CONSTRAINT_FOREIGNKEY | ffi::SQLITE_CONSTRAINT_TRIGGER => {
                        ConstraintKind::ForeignKey
                    }
                    ffi::SQLITE_CONSTRAINT_NOTNULL => ConstraintKind::NotNull,
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                        ConstraintKind::Unique
                    }
                    _ => ConstraintKind::Other,
                };
                return StoreError::Constraint {
                    kind,
                    message: message.clone().unwrap_or_else(|| err.to_string()),
                };
            }
        }
        StoreError::Sqlite(err)
    }
}

pub(crate) type StoreResult<T> = Result<T, StoreError>;
