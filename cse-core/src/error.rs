use crate::rsc::ResponseStatusCode;
use std::fmt;

/// The single error type threaded through the dispatcher and the
/// components it calls out to (validator, storage, notifier, group,
/// announcer). Carries the oneM2M response status code that should be
/// returned to the caller plus a human-readable debug string.
///
/// Modeled on the teacher's `AppError`/`DataError` split: a plain enum with
/// manual `Display`/`Error` impls and `From` bridges, no `anyhow` escape
/// hatch in library code (§A.2 of SPEC_FULL.md).
#[derive(Debug, Clone)]
pub struct CseError {
    pub rsc: ResponseStatusCode,
    pub message: String,
    /// The attribute that failed validation, when applicable (§4.2).
    pub attribute: Option<String>,
}

impl CseError {
    pub fn new(rsc: ResponseStatusCode, message: impl Into<String>) -> Self {
        Self {
            rsc,
            message: message.into(),
            attribute: None,
        }
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ResponseStatusCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ResponseStatusCode::BadRequest, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ResponseStatusCode::Conflict, message)
    }

    pub fn no_privilege(message: impl Into<String>) -> Self {
        Self::new(ResponseStatusCode::OriginatorHasNoPrivilege, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ResponseStatusCode::InternalServerError, message)
    }

    pub fn invalid_child_type(message: impl Into<String>) -> Self {
        Self::new(ResponseStatusCode::InvalidChildResourceType, message)
    }
}

impl fmt::Display for CseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.attribute {
            Some(attr) => write!(f, "[{}] {} (attribute: {attr})", self.rsc, self.message),
            None => write!(f, "[{}] {}", self.rsc, self.message),
        }
    }
}

impl std::error::Error for CseError {}

impl From<std::io::Error> for CseError {
    fn from(err: std::io::Error) -> Self {
        CseError::internal(err.to_string())
    }
}

/// Generate `From<E> for CseError` implementations that map error types to
/// a specific response status code.
///
/// # Example
///
/// ```ignore
/// cse_core::map_error! {
///     serde_json::Error => BadRequest,
/// }
/// ```
#[macro_export]
macro_rules! map_error {
    ( $( $err_ty:ty => $rsc:ident ),* $(,)? ) => {
        $(
            impl From<$err_ty> for $crate::error::CseError {
                fn from(err: $err_ty) -> Self {
                    $crate::error::CseError::new($crate::rsc::ResponseStatusCode::$rsc, err.to_string())
                }
            }
        )*
    };
}

pub type CseResult<T> = Result<T, CseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_attribute_when_set() {
        let err = CseError::bad_request("missing field").with_attribute("rn");
        assert!(err.to_string().contains("attribute: rn"));
    }

    #[test]
    fn display_omits_attribute_when_unset() {
        let err = CseError::not_found("no such resource");
        assert!(!err.to_string().contains("attribute"));
    }

    #[test]
    fn http_status_mapping_matches_spec_examples() {
        assert_eq!(ResponseStatusCode::NotFound.http_status(), 404);
        assert_eq!(ResponseStatusCode::OriginatorHasNoPrivilege.http_status(), 403);
        assert_eq!(ResponseStatusCode::InternalServerError.http_status(), 500);
    }

    #[test]
    fn io_error_maps_to_internal() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let cse_err: CseError = io_err.into();
        assert_eq!(cse_err.rsc, ResponseStatusCode::InternalServerError);
    }
}
