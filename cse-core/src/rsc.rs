//! oneM2M Response Status Codes and their mapping onto the transport-neutral
//! numeric status space used at the dispatcher boundary (§7 of the spec).
//!
//! Transports (out of scope here) are expected to map these onto their own
//! status spaces, e.g. HTTP, the same way the reference CSE maps `rsc` onto
//! `http.HTTPStatus`.

use std::fmt;

/// oneM2M Response Status Code, as returned in every dispatcher response (`rsc`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ResponseStatusCode {
    Accepted = 1000,
    AcceptedNonBlockingRequestSynch = 1001,
    AcceptedNonBlockingRequestAsynch = 1002,
    Ok = 2000,
    Created = 2001,
    Deleted = 2002,
    Updated = 2004,
    BadRequest = 4000,
    ReleaseVersionNotSupported = 4001,
    NotFound = 4004,
    OperationNotAllowed = 4005,
    RequestTimeout = 4008,
    UnsupportedMediaType = 4015,
    SubscriptionCreatorHasNoPrivilege = 4101,
    ContentsUnacceptable = 4102,
    OriginatorHasNoPrivilege = 4103,
    Conflict = 4105,
    SecurityAssociationRequired = 4107,
    InvalidChildResourceType = 4108,
    GroupMemberTypeInconsistent = 4110,
    OriginatorHasAlreadyRegistered = 4117,
    AppRuleValidationFailed = 4126,
    OperationDeniedByRemoteEntity = 4127,
    InternalServerError = 5000,
    NotImplemented = 5001,
    TargetNotReachable = 5103,
    ReceiverHasNoPrivileges = 5105,
    AlreadyExists = 5106,
    RemoteEntityNotReachable = 5107,
    TargetNotSubscribable = 5203,
    SubscriptionVerificationInitiationFailed = 5204,
    SubscriptionHostHasNoPrivilege = 5205,
    NotAcceptable = 5207,
    MaxNumberOfMemberExceeded = 6010,
    InvalidArguments = 6023,
    InsufficientArguments = 6024,
}

impl ResponseStatusCode {
    /// Map the RSC onto the HTTP status code a transport would use (§7).
    pub fn http_status(self) -> u16 {
        use ResponseStatusCode::*;
        match self {
            Ok => 200,
            Deleted => 200,
            Updated => 200,
            Created => 201,
            Accepted => 202,
            AcceptedNonBlockingRequestSynch => 202,
            AcceptedNonBlockingRequestAsynch => 202,
            BadRequest => 400,
            ContentsUnacceptable => 400,
            InsufficientArguments => 400,
            InvalidArguments => 400,
            MaxNumberOfMemberExceeded => 400,
            GroupMemberTypeInconsistent => 400,
            OriginatorHasNoPrivilege => 403,
            InvalidChildResourceType => 403,
            AlreadyExists => 403,
            TargetNotSubscribable => 403,
            ReceiverHasNoPrivileges => 403,
            SecurityAssociationRequired => 403,
            SubscriptionCreatorHasNoPrivilege => 403,
            SubscriptionHostHasNoPrivilege => 403,
            OriginatorHasAlreadyRegistered => 403,
            AppRuleValidationFailed => 403,
            OperationDeniedByRemoteEntity => 403,
            RequestTimeout => 504,
            NotFound => 404,
            TargetNotReachable => 404,
            RemoteEntityNotReachable => 404,
            OperationNotAllowed => 405,
            NotAcceptable => 406,
            Conflict => 409,
            UnsupportedMediaType => 415,
            InternalServerError => 500,
            SubscriptionVerificationInitiationFailed => 500,
            ReleaseVersionNotSupported => 501,
            NotImplemented => 501,
        }
    }

    /// True if this code represents a successful outcome (2xxx range).
    pub fn is_success(self) -> bool {
        (self as i32) < 4000
    }
}

impl fmt::Display for ResponseStatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as i32)
    }
}
