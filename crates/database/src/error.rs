use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Failed to connect to the database")]
    ConnectionError(#[source] mongodb::error::Error),

    #[error("Database operation failed")]
    OperationError(#[from] mongodb::error::Error),

    #[error("The store rejected the operation on '{collection}': {reason}")]
    Rejected { collection: String, reason: String },

    #[error("Failed to encode a document")]
    EncodeError(#[from] bson::ser::Error),

    #[error("A stored document has an unexpected shape")]
    ShapeError(#[from] core_types::CoreError),
}
