//! The per-document aggregate: one loaded PDF, its annotations, the
//! selection flow, an optional open placement editor and export bookkeeping.

use std::sync::Arc;

use thiserror::Error;

use crate::annotations::{AnnotationStore, MarkupAnnotation, MarkupKind, SelectionCandidate};
use crate::capture::{capture_selection_with, CaptureOutcome, TextLayer};
use crate::config::AppConfig;
use crate::editor::{PenOptions, PlacementEditor, PlacementError, PlacementMode, PlacementTarget, SignaturePad};
use crate::export::{
    export_document, spawn_export, CompositeSummary, ExportError, ExportHandle, ExportJob,
    ExportOutcome, ExportResult, ExportStyle, LopdfBackend, PdfBackend,
};
use crate::geometry::{Color, PageRelative, PdfPoints, Preview, Size};
use crate::state::{SelectionEvent, SelectionMachine, SelectionState};
use crate::storage::output_file_name;

pub const PDF_MIME: &str = "application/pdf";
pub const MIN_RENDER_SCALE: f64 = 0.25;
pub const MAX_RENDER_SCALE: f64 = 4.0;
const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no document is loaded")]
    NoDocument,
    #[error("page {page} is outside the document ({page_count} pages)")]
    PageOutOfRange { page: u32, page_count: usize },
    #[error("no placement editor is open")]
    NoEditor,
    #[error("export result belongs to document generation {started}, current is {current}")]
    StaleExport { started: u64, current: u64 },
    #[error(transparent)]
    Placement(#[from] PlacementError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// A file offered by the host (picker, drop target, command line).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl IncomingFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Derives the MIME type from the content for hosts without one.
    pub fn sniffed(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let mime = if bytes.starts_with(PDF_MAGIC) {
            PDF_MIME
        } else {
            "application/octet-stream"
        };
        Self::new(name, mime, bytes)
    }

    fn is_pdf(&self) -> bool {
        self.mime
            .split(';')
            .next()
            .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(PDF_MIME))
    }
}

/// Reports page geometry for a candidate document.
pub trait DocumentProbe {
    fn page_sizes(&self, bytes: &[u8]) -> ExportResult<Vec<Size<PdfPoints>>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfProbe;

impl DocumentProbe for LopdfProbe {
    fn page_sizes(&self, bytes: &[u8]) -> ExportResult<Vec<Size<PdfPoints>>> {
        Ok(LopdfBackend::load(bytes)?.page_sizes())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { page_count: usize },
    /// Not a PDF by MIME type; nothing changed.
    IgnoredMime,
    /// Claimed to be a PDF but could not be read, or has no pages; nothing changed.
    Unreadable,
}

#[derive(Debug, Clone)]
struct LoadedDocument {
    name: String,
    bytes: Arc<[u8]>,
    page_sizes: Vec<Size<PdfPoints>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub summary: CompositeSummary,
}

#[derive(Debug)]
pub struct DocumentSession {
    document: Option<LoadedDocument>,
    generation: u64,
    store: AnnotationStore,
    machine: SelectionMachine,
    editor: Option<PlacementEditor>,
    current_page: u32,
    render_scale: f64,
    active_color: Color,
    export_in_flight: bool,
    export_style: ExportStyle,
    preview_size: Size<Preview>,
    pad_size: (u32, u32),
    pen: PenOptions,
}

impl Default for DocumentSession {
    fn default() -> Self {
        Self::new(&AppConfig::default())
    }
}

impl DocumentSession {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            document: None,
            generation: 0,
            store: AnnotationStore::new(),
            machine: SelectionMachine::new(),
            editor: None,
            current_page: 1,
            render_scale: 1.0,
            active_color: config.default_color,
            export_in_flight: false,
            export_style: ExportStyle::from(config),
            preview_size: config.preview_size(),
            pad_size: (config.signature_pad_width, config.signature_pad_height),
            pen: PenOptions {
                color: Color::BLACK,
                thickness: config.signature_stroke_width,
            },
        }
    }

    pub fn load_file(&mut self, file: IncomingFile) -> LoadOutcome {
        self.load_file_with(file, &LopdfProbe)
    }

    /// Accepts `file` as the new document, resetting everything tied to the
    /// previous one. Files that are not PDFs or cannot be read are ignored.
    pub fn load_file_with<P: DocumentProbe + ?Sized>(
        &mut self,
        file: IncomingFile,
        probe: &P,
    ) -> LoadOutcome {
        if !file.is_pdf() {
            tracing::warn!(name = %file.name, mime = %file.mime, "ignoring non-PDF file");
            return LoadOutcome::IgnoredMime;
        }
        let page_sizes = match probe.page_sizes(&file.bytes) {
            Ok(sizes) if !sizes.is_empty() => sizes,
            Ok(_) => {
                tracing::warn!(name = %file.name, "ignoring PDF without pages");
                return LoadOutcome::Unreadable;
            }
            Err(err) => {
                tracing::warn!(name = %file.name, %err, "ignoring unreadable PDF");
                return LoadOutcome::Unreadable;
            }
        };

        let page_count = page_sizes.len();
        self.store.reset();
        self.apply(SelectionEvent::DocumentLoaded);
        self.editor = None;
        self.current_page = 1;
        self.generation = self.generation.wrapping_add(1);
        self.document = Some(LoadedDocument {
            name: file.name,
            bytes: Arc::from(file.bytes),
            page_sizes,
        });
        tracing::info!(
            name = self.document_name().unwrap_or_default(),
            page_count,
            generation = self.generation,
            "document loaded"
        );
        LoadOutcome::Loaded { page_count }
    }

    pub fn has_document(&self) -> bool {
        self.document.is_some()
    }

    pub fn document_name(&self) -> Option<&str> {
        self.document.as_ref().map(|document| document.name.as_str())
    }

    pub fn page_count(&self) -> usize {
        self.document
            .as_ref()
            .map_or(0, |document| document.page_sizes.len())
    }

    /// Size of a page in points; `page` is one-based.
    pub fn page_size(&self, page: u32) -> Option<Size<PdfPoints>> {
        let index = usize::try_from(page).ok()?.checked_sub(1)?;
        self.document.as_ref()?.page_sizes.get(index).copied()
    }

    pub const fn generation(&self) -> u64 {
        self.generation
    }

    pub const fn current_page(&self) -> u32 {
        self.current_page
    }

    pub const fn render_scale(&self) -> f64 {
        self.render_scale
    }

    pub const fn active_color(&self) -> Color {
        self.active_color
    }

    pub fn selection_state(&self) -> SelectionState {
        self.machine.state()
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn pending_selection(&self) -> Option<&SelectionCandidate> {
        self.store.pending_selection()
    }

    pub fn markup_count(&self) -> usize {
        self.store.markups().len()
    }

    pub const fn is_exporting(&self) -> bool {
        self.export_in_flight
    }

    fn apply(&mut self, event: SelectionEvent) -> bool {
        match self.machine.transition(event) {
            Ok(_) => true,
            Err(err) => {
                tracing::debug!(%err, "selection event ignored");
                false
            }
        }
    }

    /// Arms `kind`, or disarms it when it is already armed. A ready
    /// candidate survives a switch to the other tool.
    pub fn arm_tool(&mut self, kind: MarkupKind) -> SelectionState {
        self.apply(SelectionEvent::ArmTool(kind));
        if self.machine.state() == SelectionState::Idle {
            self.store.clear_selection();
        }
        self.machine.state()
    }

    pub fn disarm_tool(&mut self) {
        self.apply(SelectionEvent::DisarmTool);
        self.store.clear_selection();
    }

    pub fn set_color(&mut self, color: Color) {
        self.active_color = color;
    }

    /// Clamps to the document's page range. Leaving the page drops any
    /// capture in progress.
    pub fn go_to_page(&mut self, page: u32) -> u32 {
        let last = u32::try_from(self.page_count()).unwrap_or(u32::MAX).max(1);
        let target = page.clamp(1, last);
        if target != self.current_page {
            self.current_page = target;
            self.apply(SelectionEvent::PageChanged);
            self.store.clear_selection();
            tracing::debug!(page = target, "page changed");
        }
        self.current_page
    }

    /// Sets the zoom the page is rendered at. Non-finite input is ignored.
    pub fn set_render_scale(&mut self, scale: f64) -> f64 {
        if scale.is_finite() {
            self.render_scale = scale.clamp(MIN_RENDER_SCALE, MAX_RENDER_SCALE);
        }
        self.render_scale
    }

    /// Handles the end of a pointer gesture over the current page.
    ///
    /// Returns `None` when no markup tool is armed or no document is loaded.
    /// A gesture that captures nothing leaves any earlier candidate in place.
    pub fn handle_pointer_released(&mut self, layer: Option<&dyn TextLayer>) -> Option<CaptureOutcome> {
        let tool = self.machine.state().active_tool()?;
        self.document.as_ref()?;

        let outcome = capture_selection_with(layer, self.current_page, self.render_scale);
        let CaptureOutcome::Captured(candidate) = &outcome else {
            tracing::debug!(tool = tool.label(), ?outcome, "gesture produced no candidate");
            return Some(outcome);
        };

        self.apply(SelectionEvent::PointerReleased);
        match self.store.begin_selection(candidate.clone()) {
            Ok(()) => {
                self.apply(SelectionEvent::CaptureSucceeded);
            }
            Err(err) => {
                tracing::warn!(%err, "captured selection rejected");
                self.store.clear_selection();
                self.apply(SelectionEvent::CaptureDiscarded);
            }
        }
        Some(outcome)
    }

    /// Turns the pending candidate into a markup of the armed kind, using
    /// `color` or the active color. Without a candidate this does nothing.
    pub fn commit_markup(&mut self, color: Option<Color>) -> Option<MarkupAnnotation> {
        let SelectionState::CandidateReady(kind) = self.machine.state() else {
            tracing::debug!(state = %self.machine, "no candidate to commit");
            return None;
        };
        let color = color.unwrap_or(self.active_color);
        let markup = self.store.commit_markup(kind, color)?.clone();
        self.apply(SelectionEvent::CommitMarkup);
        Some(markup)
    }

    /// Opens the editor for the current page as rendered at the current scale.
    pub fn open_placement(&mut self, mode: PlacementMode) -> SessionResult<&mut PlacementEditor> {
        let page = self
            .page_size(self.current_page)
            .ok_or(SessionError::NoDocument)?;
        let rendered = Size::new(page.width * self.render_scale, page.height * self.render_scale);
        self.open_placement_with_size(mode, rendered)
    }

    /// Opens the editor against a host-measured page surface.
    pub fn open_placement_with_size(
        &mut self,
        mode: PlacementMode,
        page_size: Size<PageRelative>,
    ) -> SessionResult<&mut PlacementEditor> {
        if self.document.is_none() {
            return Err(SessionError::NoDocument);
        }
        self.disarm_tool();

        let target = PlacementTarget {
            page_number: self.current_page,
            page_size,
            render_scale: self.render_scale,
        };
        let editor = match mode {
            PlacementMode::Signature => {
                let (width, height) = self.pad_size;
                PlacementEditor::signature(
                    target,
                    self.preview_size,
                    SignaturePad::new(width, height, self.pen),
                )
            }
            PlacementMode::Comment => PlacementEditor::comment(target, self.preview_size),
        };
        tracing::debug!(mode = mode.label(), page = self.current_page, "placement editor opened");
        Ok(self.editor.insert(editor))
    }

    pub fn editor(&self) -> Option<&PlacementEditor> {
        self.editor.as_ref()
    }

    pub fn editor_mut(&mut self) -> Option<&mut PlacementEditor> {
        self.editor.as_mut()
    }

    /// Discards the open editor and everything drawn or typed in it.
    pub fn cancel_placement(&mut self) -> bool {
        self.editor.take().is_some()
    }

    /// Commits the open editor. On a validation error the editor stays open.
    pub fn commit_placement(&mut self) -> SessionResult<u64> {
        let editor = self.editor.as_ref().ok_or(SessionError::NoEditor)?;
        let page = editor.target().page_number;
        let page_count = self.page_count();
        if page_count == 0 {
            return Err(SessionError::NoDocument);
        }
        if page == 0 || page as usize > page_count {
            return Err(SessionError::PageOutOfRange { page, page_count });
        }

        let sequence = editor.commit(&mut self.store)?;
        self.editor = None;
        Ok(sequence)
    }

    pub fn output_file_name(&self) -> Option<String> {
        self.document_name().map(output_file_name)
    }

    /// Snapshots the annotations for an export and marks the session busy.
    pub fn begin_export(&mut self) -> SessionResult<ExportJob> {
        let document = self.document.as_ref().ok_or(ExportError::NoDocument)?;
        if self.export_in_flight {
            return Err(ExportError::Busy.into());
        }
        let job = ExportJob {
            generation: self.generation,
            source: Arc::clone(&document.bytes),
            snapshot: self.store.snapshot(),
            style: self.export_style,
        };
        self.export_in_flight = true;
        tracing::info!(
            generation = job.generation,
            entries = job.snapshot.len(),
            "export started"
        );
        Ok(job)
    }

    /// Accepts a finished export if the document it was taken from is still loaded.
    pub fn complete_export(&mut self, outcome: ExportOutcome) -> SessionResult<ExportedFile> {
        self.export_in_flight = false;
        if outcome.generation != self.generation {
            tracing::warn!(
                started = outcome.generation,
                current = self.generation,
                "discarding export of a document that is no longer loaded"
            );
            return Err(SessionError::StaleExport {
                started: outcome.generation,
                current: self.generation,
            });
        }
        let exported = outcome.result?;
        let file_name = self.output_file_name().ok_or(SessionError::NoDocument)?;
        Ok(ExportedFile {
            file_name,
            bytes: exported.bytes,
            summary: exported.summary,
        })
    }

    /// Clears the busy flag for an export whose result will never be collected.
    pub fn abandon_export(&mut self) {
        if self.export_in_flight {
            tracing::warn!("in-flight export abandoned");
        }
        self.export_in_flight = false;
    }

    /// Runs the export on the calling thread.
    pub fn export(&mut self) -> SessionResult<ExportedFile> {
        let job = self.begin_export()?;
        let result = export_document(&job.source, &job.snapshot, &job.style);
        self.complete_export(ExportOutcome {
            generation: job.generation,
            result,
        })
    }

    /// Runs the export on a worker thread; hand the outcome to [`Self::complete_export`].
    pub fn export_in_background(&mut self) -> SessionResult<ExportHandle> {
        Ok(spawn_export(self.begin_export()?))
    }
}
