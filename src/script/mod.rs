//! Replays a recorded interaction script against a [`DocumentSession`].
//!
//! A script is the JSON form of what a user does in the viewer: arming a
//! tool, selecting text (as the client rects the host measured), committing
//! markups, placing signatures and comments through the placement editor,
//! navigating and zooming.
//!
//! ```json
//! {
//!   "steps": [
//!     { "action": "arm_tool", "tool": "highlight" },
//!     { "action": "select_text", "text": "Total due",
//!       "container": { "x": 0, "y": 0, "width": 612, "height": 792 },
//!       "rects": [{ "x": 50, "y": 100, "width": 120, "height": 20 }] },
//!     { "action": "commit_markup", "color": "#FFD700" },
//!     { "action": "place_comment", "text": "Paid",
//!       "anchor": { "x": 30, "y": 20, "width": 120, "height": 60 } }
//!   ]
//! }
//! ```

use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::annotations::MarkupKind;
use crate::capture::{CaptureOutcome, RangeSelection, StaticTextLayer};
use crate::editor::{DragKind, PenPoint, PlacementEditor, PlacementMode};
use crate::geometry::{Color, PageRelative, Point, Preview, Rect, Size, Viewport};
use crate::session::{DocumentSession, SessionError};

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to read script {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid script: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("step {index} ({action}) failed: {source}")]
    Step {
        index: usize,
        action: &'static str,
        #[source]
        source: SessionError,
    },
    #[error("step {index}: failed to read signature image {path}: {source}")]
    SignatureImage {
        index: usize,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type ScriptResult<T> = std::result::Result<T, ScriptError>;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InteractionScript {
    pub steps: Vec<ScriptStep>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragGestureKind {
    Move,
    Resize,
}

impl From<DragGestureKind> for DragKind {
    fn from(kind: DragGestureKind) -> Self {
        match kind {
            DragGestureKind::Move => DragKind::Move,
            DragGestureKind::Resize => DragKind::Resize,
        }
    }
}

/// A pointer drag on the placement preview, from press to release.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DragGesture {
    pub kind: DragGestureKind,
    pub from: Point<Preview>,
    pub to: Point<Preview>,
}

/// Box geometry shared by both placement steps.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct PlacementGeometry {
    pub anchor: Option<Rect<Preview>>,
    pub drags: Vec<DragGesture>,
    /// Rendered page size to scale onto; defaults to the page's size at the current zoom.
    pub page_size: Option<Size<PageRelative>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScriptStep {
    ArmTool {
        tool: MarkupKind,
    },
    DisarmTool,
    SetColor {
        color: Color,
    },
    GoToPage {
        page: u32,
    },
    SetZoom {
        scale: f64,
    },
    SelectText {
        text: String,
        container: Rect<Viewport>,
        rects: Vec<Rect<Viewport>>,
    },
    /// Releasing the pointer before the text layer has mounted.
    ReleaseWithoutLayer,
    CommitMarkup {
        #[serde(default)]
        color: Option<Color>,
    },
    PlaceSignature {
        #[serde(flatten)]
        geometry: PlacementGeometry,
        #[serde(default)]
        strokes: Vec<Vec<[f32; 2]>>,
        #[serde(default)]
        image: Option<PathBuf>,
    },
    PlaceComment {
        #[serde(flatten)]
        geometry: PlacementGeometry,
        text: String,
    },
}

impl ScriptStep {
    pub const fn action(&self) -> &'static str {
        match self {
            Self::ArmTool { .. } => "arm_tool",
            Self::DisarmTool => "disarm_tool",
            Self::SetColor { .. } => "set_color",
            Self::GoToPage { .. } => "go_to_page",
            Self::SetZoom { .. } => "set_zoom",
            Self::SelectText { .. } => "select_text",
            Self::ReleaseWithoutLayer => "release_without_layer",
            Self::CommitMarkup { .. } => "commit_markup",
            Self::PlaceSignature { .. } => "place_signature",
            Self::PlaceComment { .. } => "place_comment",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub steps: usize,
    pub markups: usize,
    pub placements: usize,
    /// Steps that had no effect (nothing selected, no candidate to commit).
    pub no_ops: usize,
}

pub fn parse_script(contents: &str) -> ScriptResult<InteractionScript> {
    Ok(serde_json::from_str(contents)?)
}

pub fn load_script(path: &Path) -> ScriptResult<InteractionScript> {
    let contents = std::fs::read_to_string(path).map_err(|source| ScriptError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_script(&contents)
}

/// Applies every step in order. Relative signature image paths resolve
/// against `base_dir`.
pub fn replay(
    session: &mut DocumentSession,
    script: &InteractionScript,
    base_dir: &Path,
) -> ScriptResult<ReplayReport> {
    let mut report = ReplayReport::default();
    for (index, step) in script.steps.iter().enumerate() {
        tracing::debug!(index, action = step.action(), "replaying step");
        let applied = apply_step(session, index, step, base_dir)?;
        report.steps += 1;
        match step {
            ScriptStep::CommitMarkup { .. } if applied => report.markups += 1,
            ScriptStep::PlaceSignature { .. } | ScriptStep::PlaceComment { .. } => {
                report.placements += 1
            }
            _ if !applied => report.no_ops += 1,
            _ => {}
        }
    }
    tracing::info!(
        steps = report.steps,
        markups = report.markups,
        placements = report.placements,
        no_ops = report.no_ops,
        "script replayed"
    );
    Ok(report)
}

fn apply_step(
    session: &mut DocumentSession,
    index: usize,
    step: &ScriptStep,
    base_dir: &Path,
) -> ScriptResult<bool> {
    let step_error = |source: SessionError| ScriptError::Step {
        index,
        action: step.action(),
        source,
    };

    match step {
        ScriptStep::ArmTool { tool } => {
            session.arm_tool(*tool);
            Ok(true)
        }
        ScriptStep::DisarmTool => {
            session.disarm_tool();
            Ok(true)
        }
        ScriptStep::SetColor { color } => {
            session.set_color(*color);
            Ok(true)
        }
        ScriptStep::GoToPage { page } => {
            session.go_to_page(*page);
            Ok(true)
        }
        ScriptStep::SetZoom { scale } => {
            session.set_render_scale(*scale);
            Ok(true)
        }
        ScriptStep::SelectText {
            text,
            container,
            rects,
        } => {
            let layer = StaticTextLayer::new(
                *container,
                Some(RangeSelection::new(text.clone(), rects.clone())),
            );
            let outcome = session.handle_pointer_released(Some(&layer));
            Ok(matches!(outcome, Some(CaptureOutcome::Captured(_))))
        }
        ScriptStep::ReleaseWithoutLayer => {
            session.handle_pointer_released(None);
            Ok(false)
        }
        ScriptStep::CommitMarkup { color } => Ok(session.commit_markup(*color).is_some()),
        ScriptStep::PlaceSignature {
            geometry,
            strokes,
            image,
        } => {
            let image = match image {
                Some(path) => {
                    let path = base_dir.join(path);
                    let bytes = std::fs::read(&path).map_err(|source| {
                        ScriptError::SignatureImage {
                            index,
                            path: path.clone(),
                            source,
                        }
                    })?;
                    Some(bytes)
                }
                None => None,
            };
            let editor = open_editor(session, PlacementMode::Signature, geometry).map_err(step_error)?;
            match image {
                Some(bytes) => {
                    editor.set_signature_image(bytes);
                }
                None => {
                    if let Some(pad) = editor.signature_pad_mut() {
                        for stroke in strokes {
                            let mut points = stroke.iter().map(|[x, y]| PenPoint::new(*x, *y));
                            let Some(first) = points.next() else {
                                continue;
                            };
                            pad.begin_stroke(first);
                            for point in points {
                                pad.extend_stroke(point);
                            }
                            pad.end_stroke();
                        }
                    }
                }
            }
            commit_editor(session).map_err(step_error)
        }
        ScriptStep::PlaceComment { geometry, text } => {
            let editor = open_editor(session, PlacementMode::Comment, geometry).map_err(step_error)?;
            editor.set_comment_text(text.clone());
            commit_editor(session).map_err(step_error)
        }
    }
}

fn open_editor<'a>(
    session: &'a mut DocumentSession,
    mode: PlacementMode,
    geometry: &PlacementGeometry,
) -> Result<&'a mut PlacementEditor, SessionError> {
    let editor = match geometry.page_size {
        Some(page_size) => session.open_placement_with_size(mode, page_size)?,
        None => session.open_placement(mode)?,
    };
    if let Some(anchor) = geometry.anchor {
        editor.set_anchor(anchor);
    }
    for gesture in &geometry.drags {
        let mut drag = editor.begin_drag(gesture.kind.into(), gesture.from);
        drag.update(gesture.to);
        drag.finish();
    }
    Ok(editor)
}

/// Commits the open editor; a rejected commit closes it so the script can go on.
fn commit_editor(session: &mut DocumentSession) -> Result<bool, SessionError> {
    match session.commit_placement() {
        Ok(_) => Ok(true),
        Err(err) => {
            session.cancel_placement();
            Err(err)
        }
    }
}
