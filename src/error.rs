use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrainError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Brain file codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("Corrupt brain file: {reason}")]
    Corrupt { reason: String },

    #[error("Zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Missing brain info: {key}")]
    MissingInfo { key: String },

    #[error("Cannot read version {found} brain")]
    UnsupportedVersion { found: String },

    #[error("Unknown tokenizer: {name}")]
    UnknownTokenizer { name: String },

    #[error("Unknown stemmer: {name}")]
    UnknownStemmer { name: String },

    #[error("Invalid order {order}: must be at least 1")]
    InvalidOrder { order: usize },

    #[error("Unknown edge: {0}")]
    UnknownEdge(u32),
}

pub type Result<T> = std::result::Result<T, BrainError>;
