use std::fmt;

/// The three entry points a hosting runtime can call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryPoint {
    /// Runs once when the ledger is deployed; creates an account.
    Init,
    /// Submits a ledger-changing transaction.
    Invoke,
    /// Reads state; never recorded on the ledger.
    Query,
}

impl EntryPoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryPoint::Init => "init",
            EntryPoint::Invoke => "invoke",
            EntryPoint::Query => "query",
        }
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The only function name the query entry point accepts.
pub const QUERY_FUNCTION: &str = "query";

/// A validated request against a single account.
///
/// Amount arguments are carried as the caller sent them. They are parsed by
/// the service, which for increments only happens after the account read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Initialize { key: String, value: String },
    Increment { key: String, amount: String },
    Query { key: String },
}

impl Invocation {
    /// Translate the string-based host surface into a typed invocation.
    ///
    /// Init and invoke ignore the function name. Query checks it before
    /// looking at the arguments.
    pub fn from_entry_point(
        entry: EntryPoint,
        function: &str,
        args: &[String],
    ) -> Result<Self, InvocationError> {
        match entry {
            EntryPoint::Init => match args {
                [key, value] => Ok(Invocation::Initialize {
                    key: key.clone(),
                    value: value.clone(),
                }),
                _ => Err(InvocationError::ArgumentCount {
                    entry,
                    actual: args.len(),
                }),
            },
            EntryPoint::Invoke => match args {
                [key, amount] => Ok(Invocation::Increment {
                    key: key.clone(),
                    amount: amount.clone(),
                }),
                _ => Err(InvocationError::ArgumentCount {
                    entry,
                    actual: args.len(),
                }),
            },
            EntryPoint::Query => {
                if function != QUERY_FUNCTION {
                    return Err(InvocationError::UnknownFunction(function.to_string()));
                }
                match args {
                    [key] => Ok(Invocation::Query { key: key.clone() }),
                    _ => Err(InvocationError::ArgumentCount {
                        entry,
                        actual: args.len(),
                    }),
                }
            }
        }
    }

    /// The account key this invocation touches.
    pub fn key(&self) -> &str {
        match self {
            Invocation::Initialize { key, .. }
            | Invocation::Increment { key, .. }
            | Invocation::Query { key } => key,
        }
    }

    pub fn operation(&self) -> &'static str {
        match self {
            Invocation::Initialize { .. } => "initialize",
            Invocation::Increment { .. } => "increment",
            Invocation::Query { .. } => "query",
        }
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self, Invocation::Query { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationError {
    ArgumentCount { entry: EntryPoint, actual: usize },
    UnknownFunction(String),
}

impl fmt::Display for InvocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvocationError::ArgumentCount {
                entry: EntryPoint::Query,
                actual,
            } => write!(
                f,
                "incorrect number of arguments, expecting name of the account to query (got {})",
                actual
            ),
            InvocationError::ArgumentCount { actual, .. } => write!(
                f,
                "incorrect number of arguments, expecting 2 (got {})",
                actual
            ),
            InvocationError::UnknownFunction(name) => write!(
                f,
                "invalid query function name '{}', expecting \"{}\"",
                name, QUERY_FUNCTION
            ),
        }
    }
}

impl std::error::Error for InvocationError {}
