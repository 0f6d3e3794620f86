use thiserror::Error;

#[derive(Debug, Error)]
pub enum NeedsbookError {
    #[error("Invalid value: {0}")]
    Parse(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Setup has not been completed yet, run `needsbook setup` first")]
    SetupRequired,
    #[error("Setup is already completed, use `needsbook settings` to change the profile")]
    SetupAlreadyCompleted,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] toml::de::Error),
    #[error("Snapshot decoding error: {0}")]
    SnapshotDecode(#[from] rmp_serde::decode::Error),
    #[error("Snapshot encoding error: {0}")]
    SnapshotEncode(#[from] rmp_serde::encode::Error),
    #[error("Compression error: {0}")]
    Compression(#[from] lz4_flex::frame::Error),
    #[error("Encryption error: {0}")]
    Encryption(#[from] age::EncryptError),
    #[error("Decryption error: {0}")]
    Decryption(#[from] age::DecryptError),
    #[error("Prompt error: {0}")]
    Prompt(#[from] inquire::InquireError),
}
