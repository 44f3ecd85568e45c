use thiserror::Error;

/// Failure raised at the store boundary.
///
/// The set is closed: callers classify on the variant, never on the message.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The identifier cannot address any record.
    #[error("malformed identifier '{0}'")]
    MalformedId(String),

    /// One message per violated schema constraint, in schema field order.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Connectivity or any other unclassified backend fault.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
