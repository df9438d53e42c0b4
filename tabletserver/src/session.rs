//! Session establishment for one tablet.
//!
//! A tablet serves exactly one keyspace/shard target. `GetSessionId` checks
//! the caller's target against it and hands out the session id agreed on at
//! startup; every later request must carry that id.

use crate::queryservice::QueryServiceError;
use crate::types::{SessionId, SessionParams};

/// Validates session targets and session ids for one tablet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    keyspace: String,
    shard: String,
    session_id: SessionId,
}

impl SessionContext {
    #[must_use]
    pub fn new(
        keyspace: impl Into<String>,
        shard: impl Into<String>,
        session_id: SessionId,
    ) -> Self {
        Self {
            keyspace: keyspace.into(),
            shard: shard.into(),
            session_id,
        }
    }

    /// The session id for a caller targeting `params.keyspace` / `params.shard`.
    ///
    /// # Errors
    ///
    /// Returns `QueryServiceError::ProtocolViolation` if the target is not
    /// the one this tablet serves.
    pub fn get_session_id(&self, params: &SessionParams) -> Result<SessionId, QueryServiceError> {
        if params.keyspace != self.keyspace {
            return Err(QueryServiceError::ProtocolViolation(format!(
                "invalid keyspace: got {} expected {}",
                params.keyspace, self.keyspace
            )));
        }
        if params.shard != self.shard {
            return Err(QueryServiceError::ProtocolViolation(format!(
                "invalid shard: got {} expected {}",
                params.shard, self.shard
            )));
        }
        Ok(self.session_id)
    }

    /// Check that a request carries this tablet's session id.
    ///
    /// # Errors
    ///
    /// Returns `QueryServiceError::ProtocolViolation` for any other id.
    pub fn validate(&self, session_id: SessionId) -> Result<(), QueryServiceError> {
        if session_id != self.session_id {
            return Err(QueryServiceError::ProtocolViolation(format!(
                "invalid session id: got {session_id} expected {}",
                self.session_id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> SessionContext {
        SessionContext::new("test_keyspace", "test_shard", SessionId(5678))
    }

    fn params(keyspace: &str, shard: &str) -> SessionParams {
        SessionParams {
            keyspace: keyspace.to_string(),
            shard: shard.to_string(),
        }
    }

    #[test]
    fn test_get_session_id_is_stable() {
        let ctx = context();
        let first = ctx.get_session_id(&params("test_keyspace", "test_shard"));
        let second = ctx.get_session_id(&params("test_keyspace", "test_shard"));
        assert_eq!(first, Ok(SessionId(5678)));
        assert_eq!(first, second);
    }

    #[test]
    fn test_get_session_id_wrong_keyspace() {
        let err = context()
            .get_session_id(&params("other", "test_shard"))
            .unwrap_err();
        assert_eq!(
            err,
            QueryServiceError::ProtocolViolation(
                "invalid keyspace: got other expected test_keyspace".to_string()
            )
        );
    }

    #[test]
    fn test_get_session_id_wrong_shard() {
        let err = context()
            .get_session_id(&params("test_keyspace", "-80"))
            .unwrap_err();
        assert!(matches!(err, QueryServiceError::ProtocolViolation(_)));
    }

    #[test]
    fn test_validate() {
        let ctx = context();
        assert!(ctx.validate(SessionId(5678)).is_ok());
        assert!(matches!(
            ctx.validate(SessionId(1)),
            Err(QueryServiceError::ProtocolViolation(_))
        ));
    }
}
