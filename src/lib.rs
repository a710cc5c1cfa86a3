pub mod annotations;
pub mod capture;
pub mod config;
pub mod editor;
pub mod error;
pub mod export;
pub mod geometry;
pub mod logging;
pub mod script;
pub mod session;
pub mod state;
pub mod storage;
pub mod transform;
pub use error::{AppError, AppResult};

use std::path::{Path, PathBuf};

use config::AppConfig;
use session::{DocumentSession, IncomingFile, LoadOutcome};
use storage::StorageService;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub input: PathBuf,
    pub script: PathBuf,
    /// Defaults to the input's directory.
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub output: PathBuf,
    pub markups: usize,
    pub placements: usize,
    pub skipped: usize,
}

/// Entrypoint used by the CLI: load, replay, export, save.
pub fn run(options: &RunOptions) -> AppResult<RunSummary> {
    logging::init();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting docsigner");
    run_with_config(options, &config::load_app_config())
}

pub fn run_with_config(options: &RunOptions, config: &AppConfig) -> AppResult<RunSummary> {
    let mut session = DocumentSession::new(config);
    let bytes = storage::read_document(&options.input)?;
    let name = options
        .input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    match session.load_file(IncomingFile::sniffed(name, bytes)) {
        LoadOutcome::Loaded { .. } => {}
        LoadOutcome::IgnoredMime | LoadOutcome::Unreadable => {
            return Err(AppError::UnsupportedDocument {
                path: options.input.display().to_string(),
            });
        }
    }

    let script = script::load_script(&options.script)?;
    let report = script::replay(&mut session, &script, parent_or_current(&options.script))?;

    let handle = session.export_in_background()?;
    let exported = session.complete_export(handle.wait())?;

    let output_dir = options
        .output_dir
        .clone()
        .unwrap_or_else(|| parent_or_current(&options.input).to_path_buf());
    let output =
        StorageService::with_output_dir(output_dir).save_export(&exported.file_name, &exported.bytes)?;

    Ok(RunSummary {
        output,
        markups: report.markups,
        placements: report.placements,
        skipped: exported.summary.skipped,
    })
}

fn parent_or_current(path: &Path) -> &Path {
    path.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::fixtures::blank_pdf;

    #[test]
    fn run_writes_annotated_copy_next_to_requested_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("lease.pdf");
        std::fs::write(&input, blank_pdf(1, 612, 792)).expect("write pdf");
        let script = dir.path().join("steps.json");
        std::fs::write(
            &script,
            r#"{ "steps": [
                { "action": "arm_tool", "tool": "underline" },
                { "action": "select_text", "text": "Rent",
                  "container": { "x": 10, "y": 10, "width": 612, "height": 792 },
                  "rects": [{ "x": 60, "y": 110, "width": 80, "height": 14 }] },
                { "action": "commit_markup" },
                { "action": "place_comment", "text": "Signed copy attached" }
            ] }"#,
        )
        .expect("write script");

        let options = RunOptions {
            input,
            script,
            output_dir: Some(dir.path().join("out")),
        };
        let summary = run_with_config(&options, &AppConfig::default()).expect("run");

        assert_eq!(summary.output, dir.path().join("out").join("annotated_lease.pdf"));
        assert_eq!((summary.markups, summary.placements, summary.skipped), (1, 1, 0));
        let written = std::fs::read(&summary.output).expect("read output");
        assert!(written.starts_with(b"%PDF-"));
    }

    #[test]
    fn non_pdf_input_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("notes.pdf");
        std::fs::write(&input, b"just text").expect("write");
        let options = RunOptions {
            input,
            script: dir.path().join("unused.json"),
            output_dir: None,
        };
        assert!(matches!(
            run_with_config(&options, &AppConfig::default()),
            Err(AppError::UnsupportedDocument { .. })
        ));
    }

    #[test]
    fn parent_of_bare_file_name_is_current_directory() {
        assert_eq!(parent_or_current(Path::new("doc.pdf")), Path::new("."));
        assert_eq!(parent_or_current(Path::new("/a/doc.pdf")), Path::new("/a"));
    }
}
