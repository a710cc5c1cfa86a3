use thiserror::Error;

pub type AnnotationResult<T> = std::result::Result<T, AnnotationError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnnotationError {
    #[error("selection has zero width or height")]
    EmptySelection,
    #[error("comment text is blank")]
    BlankComment,
    #[error("signature image is empty")]
    EmptySignature,
    #[error("page number {0} is out of range")]
    InvalidPageNumber(u32),
}
