//! Page-scoped annotation entities and the append-only store that owns them.

pub mod error;
pub mod model;
pub mod store;

pub use error::{AnnotationError, AnnotationResult};
pub use model::{
    AnnotationRef, AnnotationSnapshot, CommentPlacement, MarkupAnnotation, MarkupKind,
    SelectionCandidate, SignaturePlacement,
};
pub use store::AnnotationStore;
