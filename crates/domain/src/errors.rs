//! Error taxonomy surfaced by the resolver core (§7), plus the RCODE each
//! kind maps to when it terminates a request.

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ResolverError {
    #[error("invalid argument")]
    Invalid,
    #[error("arena/allocation exhausted")]
    NoMem,
    #[error("illegal name or wire encoding")]
    Ilseq,
    #[error("DNS message parse failure")]
    Proto,
    #[error("truncated or oversize wire message")]
    MsgSize,
    #[error("cache miss or endpoint absent")]
    NoEnt,
    #[error("cache entry present but expired")]
    Stale,
    #[error("resolution plan loop detected")]
    ELoop,
    #[error("iteration limit reached")]
    ELimit,
    #[error("I/O send/receive failure")]
    Eio,
    #[error("origin handle closed before answer")]
    ENotConn,
    #[error("attempt deadline elapsed with no send/receive failure")]
    Timeout,
}

impl ResolverError {
    /// Whether this failure is fatal to the whole request (as opposed to
    /// recoverable by invalidating the current nameserver and retrying).
    pub fn is_request_fatal(&self) -> bool {
        matches!(
            self,
            ResolverError::ELoop | ResolverError::ELimit | ResolverError::NoMem | ResolverError::Invalid
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_and_limit_are_request_fatal() {
        assert!(ResolverError::ELoop.is_request_fatal());
        assert!(ResolverError::ELimit.is_request_fatal());
    }

    #[test]
    fn eio_is_recoverable_per_nameserver() {
        assert!(!ResolverError::Eio.is_request_fatal());
    }
}
