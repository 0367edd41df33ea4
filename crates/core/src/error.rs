use sncop_types::ResourceKindError;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("no file uploaded")]
    NoFile,
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("unit is required for notes")]
    UnitRequired,
    #[error("only PDF and image files are allowed: {0}")]
    UnsupportedFileType(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    InvalidKind(#[from] ResourceKindError),
    #[error("file not found")]
    FileNotFound,
    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to create directory: {0}")]
    DirCreation(std::io::Error),
    #[error("failed to remove directory: {0}")]
    DirRemoval(std::io::Error),
    #[error("failed to read directory: {0}")]
    DirList(std::io::Error),
    #[error("failed to write file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to delete file: {0}")]
    FileDelete(std::io::Error),
    #[error("failed to serialize catalog: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize catalog: {0}")]
    Deserialization(serde_json::Error),
}

impl StorageError {
    /// True for errors caused by the request rather than by the server.
    ///
    /// The REST layer maps these to 400 responses; `FileNotFound` maps to
    /// 404 and everything else to 500.
    pub fn is_invalid_request(&self) -> bool {
        matches!(
            self,
            StorageError::NoFile
                | StorageError::MissingField(_)
                | StorageError::UnitRequired
                | StorageError::UnsupportedFileType(_)
                | StorageError::InvalidInput(_)
                | StorageError::InvalidKind(_)
        )
    }
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;
