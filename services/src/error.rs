use db::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("could not encode QR code: {0}")]
    QrEncode(#[from] qrcode::types::QrError),
    #[error("could not serialize payload: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("attendance claim was not verified: {0}")]
    NotVerified(String),
}
