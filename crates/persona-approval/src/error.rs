/// Errors that can occur in the permission and approval layer.
#[derive(Debug, thiserror::Error)]
pub enum ApprovalError {
    /// No approval is pending for the session.
    #[error("no pending approval for session {session_id}")]
    NotPending {
        /// The session that was inspected.
        session_id: String,
    },

    /// Approval configuration is unusable.
    #[error("invalid approval configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for approval operations.
pub type ApprovalResult<T> = Result<T, ApprovalError>;
