use database::DbError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MaintenanceError {
    #[error(transparent)]
    Database(#[from] DbError),

    #[error("Maintenance task '{task}' failed")]
    TaskFailed {
        task: String,
        #[source]
        source: Box<MaintenanceError>,
    },

    #[error("Failed to encode a report")]
    EncodeError(#[from] bson::ser::Error),

    #[error("Failed to render a report as JSON")]
    JsonError(#[from] serde_json::Error),
}
