#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    #[error("patient not found: {0}")]
    NotFound(String),
    #[error("patient already exists: {0}")]
    AlreadyExists(String),
    #[error("{0}")]
    InvalidQuery(String),
    #[error("failed to read patient file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to write patient file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to serialize patient data: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize patient data: {0}")]
    Deserialization(serde_json::Error),
}

pub type PatientResult<T> = std::result::Result<T, PatientError>;
