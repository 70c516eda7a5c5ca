use core::error::Error;
use pisserror::Error;

/// A problem with the syntax of a search query.
///
/// `MissingIdentity` is about *who* is asking, so it's reported as an
/// authorization problem. See [`SearchError::status`].
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("The sort `{name}` isn't known. Use `sort:new` or `sort:old`.")]
    InvalidSort { name: String },

    #[error("The `private` group can only be searched by a logged-in user.")]
    MissingIdentity,

    #[error("Only one exclusive group is allowed, but got both `{first}` and `{second}`.")]
    ConflictingGroup { first: String, second: String },

    #[error("The double-quoted note pattern isn't a valid regular expression. See: `{_0}`")]
    InvalidNotePattern(regex::Error),
}

#[derive(Debug, Error)]
pub enum AuthorizationError {
    #[error("You do not have access to the group `{group}`.")]
    Forbidden { group: String },
}

/// Bad paging parameters given alongside a search.
#[derive(Debug, Error)]
pub enum PaginationError {
    #[error("The query is too long. Got {len} bytes, but the limit is {max}.")]
    QueryTooLong { len: usize, max: usize },

    #[error("Invalid `max`: `{given}`. It must be a whole number from 0 to 500.")]
    InvalidMax { given: String },

    #[error("Invalid `skip`: `{given}`. It must be a whole number, zero or more.")]
    InvalidSkip { given: String },
}

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("General database error. See: {_0}")]
    GeneralDatabaseError(#[from] sqlx::Error),

    #[error("Failed to connect to the database. See: {_0}")]
    ConnectionError(String),

    #[error("Failed to migrate the database. See: {_0}")]
    MigrationFailed(#[from] sqlx::migrate::MigrateError),
}

/// Everything that can go wrong while answering a search.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Failed to parse query: {_0}")]
    Parse(#[from] ParseError),

    #[error("{_0}")]
    Pagination(#[from] PaginationError),

    #[error("{_0}")]
    Authorization(#[from] AuthorizationError),

    #[error("The search failed in the database. See: {_0}")]
    Database(#[from] DatabaseError),

    #[error("The search took longer than {secs} seconds and was cancelled.")]
    TimedOut { secs: u64 },
}

impl SearchError {
    /// The HTTP status that best describes this error.
    pub fn status(&self) -> u16 {
        match self {
            SearchError::Parse(ParseError::MissingIdentity) => 403,
            SearchError::Parse(_) | SearchError::Pagination(_) => 400,
            SearchError::Authorization(_) => 403,
            SearchError::Database(_) | SearchError::TimedOut { .. } => 500,
        }
    }

    /// A message that's safe to show to whoever made the request.
    ///
    /// Backend failures don't leak their details.
    pub fn public_message(&self) -> String {
        match self {
            SearchError::Database(_) => String::from("internal server error"),
            SearchError::TimedOut { .. } => {
                String::from("the search timed out. please try again later")
            }
            other => other.to_string(),
        }
    }

    /// Whether trying the same request again later might work.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SearchError::TimedOut { .. })
    }
}

/// Write-path validation failures. These are always the caller's fault.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("url is empty")]
    EmptyUrl,

    #[error("url is too long (>{max})")]
    UrlTooLong { max: usize },

    #[error("url `{url}` is not an http or https url")]
    UrlNotHttp { url: String },

    #[error("domain `{domain}` is not allowed")]
    DomainNotAllowed { domain: String },

    #[error("too many tags (>{max})")]
    TooManyTags { max: usize },

    #[error("invalid tag: {tag}")]
    InvalidTag { tag: String },

    #[error("duplicate tag: {tag}")]
    DuplicateTag { tag: String },

    #[error("note is too long (>{max})")]
    NoteTooLong { max: usize },

    #[error("group is an empty string. use null instead")]
    EmptyGroup,

    #[error("{field} is an empty string. use null instead")]
    EmptyField { field: String },

    #[error("{field} is too long (>{max})")]
    FieldTooLong { field: String, max: usize },

    #[error("category `{name}` does not exist")]
    UnknownCategory { name: String },

    #[error("name `{name}` is reserved")]
    ReservedName { name: String },

    #[error("invalid name: {name}")]
    InvalidName { name: String },

    #[error("invalid color: {color}")]
    InvalidColor { color: String },

    #[error("invalid username: {username}")]
    InvalidUsername { username: String },

    #[error("could not find the {what} url for a preview in the tenor page")]
    MissingPreview { what: String },
}

/// Failures when reading or writing the catalogue on someone's behalf.
#[derive(Debug, Error)]
pub enum CatalogueError {
    #[error("{_0}")]
    Validation(#[from] ValidationError),

    #[error("{reason}")]
    Forbidden { reason: String },

    #[error("No {what} was found with the key `{key}`.")]
    NotFound { what: String, key: String },

    #[error("The catalogue's database failed. See: {_0}")]
    Database(#[from] DatabaseError),
}

impl CatalogueError {
    pub fn status(&self) -> u16 {
        match self {
            CatalogueError::Validation(_) => 400,
            CatalogueError::Forbidden { .. } => 403,
            CatalogueError::NotFound { .. } => 404,
            CatalogueError::Database(_) => 500,
        }
    }
}

impl From<sqlx::Error> for CatalogueError {
    fn from(value: sqlx::Error) -> Self {
        CatalogueError::Database(DatabaseError::GeneralDatabaseError(value))
    }
}

/// A stored notification that this version doesn't understand.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("`{kind}` is not a known notification kind.")]
    UnknownKind { kind: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    /// during fs read from disk
    #[error("Failed to read config file. See: `{_0}`")]
    ReadFailed(#[from] tokio::io::Error),

    /// parsing
    #[error("Failed to parse config file. See: `{_0}`")]
    ParseFailed(#[from] toml::de::Error),

    #[error("A built-in validation pattern failed to compile. See: `{_0}`")]
    BadPattern(#[from] regex::Error),
}
