use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Wrong number of type arguments or call arguments
    ArityMismatch,
    UnboundParameter,
    UnsupportedTypeArgument,
    /// Construction through an alias that still has unbound parameters
    IncompleteSpecialization,
    UnresolvedParameterReference,
    UnsupportedOverride,
    /// A record that would contain itself by value, or unbounded nesting
    RecursiveLayout,
    UnknownType,
    UnknownName,
    DuplicateDefinition,
    TypeMismatch,
    Parse,
    Runtime,
}

impl ErrorKind {
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::ArityMismatch => "arity mismatch",
            ErrorKind::UnboundParameter => "unbound parameter",
            ErrorKind::UnsupportedTypeArgument => "unsupported type argument",
            ErrorKind::IncompleteSpecialization => "incomplete specialization",
            ErrorKind::UnresolvedParameterReference => "unresolved parameter reference",
            ErrorKind::UnsupportedOverride => "unsupported override",
            ErrorKind::RecursiveLayout => "recursive layout",
            ErrorKind::UnknownType => "unknown type",
            ErrorKind::UnknownName => "unknown name",
            ErrorKind::DuplicateDefinition => "duplicate definition",
            ErrorKind::TypeMismatch => "type mismatch",
            ErrorKind::Parse => "parse error",
            ErrorKind::Runtime => "runtime error",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone)]
pub struct JitError {
    pub kind: ErrorKind,
    pub message: String,
}

impl JitError {
    fn make(kind: ErrorKind, message: impl AsRef<str>) -> JitError {
        JitError { kind, message: message.as_ref().to_owned() }
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

impl Display for JitError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl Error for JitError {}

pub type JitResult<A> = Result<A, JitError>;

pub fn make_error<T: AsRef<str>>(kind: ErrorKind, message: T) -> JitError {
    JitError::make(kind, message)
}

pub fn make_fail<A, T: AsRef<str>>(kind: ErrorKind, message: T) -> JitResult<A> {
    Err(make_error(kind, message))
}

#[macro_export]
macro_rules! errf {
    ($kind:expr, $($format_args:expr),* $(,)?) => {
        {
            let s: String = format!($($format_args),*);
            $crate::error::make_error($kind, &s)
        }
    };
}

#[macro_export]
macro_rules! failf {
    ($kind:expr, $($format_args:expr),* $(,)?) => {
        {
            let s: String = format!($($format_args),*);
            $crate::error::make_fail($kind, &s)
        }
    };
}
