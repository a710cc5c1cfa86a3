use crate::export::ExportError;
use crate::script::ScriptError;
use crate::session::SessionError;
use crate::storage::StorageError;
use thiserror::Error;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{path} is not a readable PDF")]
    UnsupportedDocument { path: String },
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Script(#[from] ScriptError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
