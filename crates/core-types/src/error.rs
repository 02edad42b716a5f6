use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Document does not have the expected shape")]
    Shape(#[from] bson::de::Error),
}
