//! Writing report artifacts for a submitted session.

use crate::cli::error::HelpfulError;
use anyhow::Result;
use serde::Serialize;
use solesource_core::{
    format_report_now, render_document, render_text, Artifact, DocumentLayout, Downloader,
    ExportError, FsDownloader, ReportProfile, Wizard,
};
use std::path::{Path, PathBuf};

/// Where an artifact was written.
#[derive(Debug, Clone, Serialize)]
pub struct ExportedFile {
    pub path: PathBuf,
    pub media_type: &'static str,
    pub bytes: usize,
}

/// Report lines for a submitted session, `None` before submission.
pub fn report_lines(wizard: &Wizard, profile: &ReportProfile) -> Option<Vec<String>> {
    let result = wizard.result()?;
    Some(format_report_now(
        wizard.record(),
        result,
        wizard.catalog(),
        profile,
    ))
}

pub fn default_text_name(wizard: &Wizard) -> String {
    format!("sole-source-{}.txt", wizard.session_id().short())
}

pub fn default_document_name(wizard: &Wizard) -> String {
    format!("sole-source-{}.pdf", wizard.session_id().short())
}

pub fn text_artifact(lines: &[String], filename: &str) -> Artifact {
    render_text(lines, filename)
}

pub fn document_artifact(lines: &[String], filename: &str) -> Result<Artifact> {
    Ok(render_document(lines, &DocumentLayout::default(), filename)?)
}

/// Hand an artifact to a downloader, mapping failures to a helpful error.
pub fn deliver(downloader: &dyn Downloader, artifact: &Artifact) -> Result<ExportedFile> {
    match downloader.download(artifact) {
        Ok(path) => Ok(ExportedFile {
            path,
            media_type: artifact.media_type,
            bytes: artifact.len(),
        }),
        Err(ExportError::Io { path, source }) => {
            Err(HelpfulError::cannot_write_export(&path, &source.to_string()).into())
        }
        Err(other) => Err(other.into()),
    }
}

/// Write an artifact to an explicit file path.
pub fn write_to_path(target: &Path, artifact: Artifact) -> Result<ExportedFile> {
    let (dir, filename) = split_target(target)?;
    let artifact = Artifact {
        filename,
        ..artifact
    };
    deliver(&FsDownloader::new(dir), &artifact)
}

fn split_target(target: &Path) -> Result<(PathBuf, String)> {
    let filename = target
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            HelpfulError::new(format!("Not a file path: {}", target.display()))
                .with_suggestion("TRY: Pass a file name such as report.pdf")
        })?
        .to_string();
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, filename))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_split_target() {
        let (dir, name) = split_target(Path::new("out/report.pdf")).unwrap();
        assert_eq!(dir, PathBuf::from("out"));
        assert_eq!(name, "report.pdf");

        let (dir, name) = split_target(Path::new("report.txt")).unwrap();
        assert_eq!(dir, PathBuf::from("."));
        assert_eq!(name, "report.txt");

        assert!(split_target(Path::new("/")).is_err());
    }

    #[test]
    fn test_write_to_path_renames_artifact() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("nested").join("answers.txt");
        let artifact = text_artifact(&["hello".to_string()], "ignored.txt");

        let written = write_to_path(&target, artifact).unwrap();
        assert_eq!(written.path, target);
        assert_eq!(written.media_type, "text/plain");
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "hello\n");
    }

    #[test]
    fn test_report_lines_requires_submission() {
        let wizard = Wizard::default();
        assert!(report_lines(&wizard, &ReportProfile::default()).is_none());
        assert!(default_text_name(&wizard).starts_with("sole-source-"));
        assert!(default_document_name(&wizard).ends_with(".pdf"));
    }
}
