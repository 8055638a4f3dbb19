//! Word / Excel / text → PDF through a headless LibreOffice.
//!
//! LibreOffice writes `<input stem>.pdf` into `--outdir`; we point it at a
//! scratch directory next to the requested output and move the result into
//! place. Executables are tried in order (configured path, `libreoffice`,
//! `soffice`); one that cannot be started is skipped, one that runs but
//! produces nothing is remembered as the failure reason.

use crate::error::ConvertError;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Executables to try, in order.
pub fn candidates(configured: Option<&Path>) -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = configured.map(Path::to_path_buf).into_iter().collect();
    for name in ["libreoffice", "soffice"] {
        if !out.iter().any(|p| p == Path::new(name)) {
            out.push(PathBuf::from(name));
        }
    }
    out
}

/// Where LibreOffice puts the PDF for `input` when run with `--outdir out_dir`.
pub fn expected_output(input: &Path, out_dir: &Path) -> PathBuf {
    let mut name = input.file_stem().unwrap_or(input.as_os_str()).to_os_string();
    name.push(".pdf");
    out_dir.join(name)
}

/// Convert `input` to a PDF at `output`.
pub async fn convert_to_pdf(
    input: &Path,
    output: &Path,
    configured: Option<&Path>,
    timeout: Duration,
) -> Result<(), ConvertError> {
    let parent = output.parent().unwrap_or_else(|| Path::new("."));
    let scratch = tempfile::Builder::new()
        .prefix(".office-")
        .tempdir_in(parent)
        .map_err(|e| ConvertError::io(parent, e))?;
    let produced = expected_output(input, scratch.path());

    let mut tried = Vec::new();
    let mut last_failure: Option<String> = None;

    for exe in candidates(configured) {
        let mut cmd = Command::new(&exe);
        cmd.arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(scratch.path())
            .arg(input)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        debug!(exe = %exe.display(), input = %input.display(), "running office converter");

        let result = match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(result) => result,
            Err(_) => {
                return Err(ConvertError::Timeout {
                    operation: "office conversion",
                    secs: timeout.as_secs(),
                })
            }
        };

        match result {
            Err(e) => {
                debug!(exe = %exe.display(), "cannot start: {e}");
                tried.push(exe.display().to_string());
            }
            Ok(out) if tokio::fs::metadata(&produced).await.is_ok() => {
                move_into_place(&produced, output).await?;
                info!(
                    exe = %exe.display(),
                    status = %out.status,
                    output = %output.display(),
                    "office conversion done"
                );
                return Ok(());
            }
            Ok(out) => {
                let stderr = String::from_utf8_lossy(&out.stderr);
                let detail = format!("{} exited with {}: {}", exe.display(), out.status, stderr.trim());
                warn!("{detail}");
                tried.push(exe.display().to_string());
                last_failure = Some(detail);
            }
        }
    }

    match last_failure {
        Some(detail) => Err(ConvertError::Office {
            path: input.to_path_buf(),
            detail,
        }),
        None => Err(ConvertError::OfficeUnavailable { tried }),
    }
}

async fn move_into_place(from: &Path, to: &Path) -> Result<(), ConvertError> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(from, to)
        .await
        .map_err(|e| ConvertError::io(to, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_path_tried_first_without_duplicates() {
        let c = candidates(Some(Path::new("/opt/lo/soffice")));
        assert_eq!(
            c,
            vec![
                PathBuf::from("/opt/lo/soffice"),
                PathBuf::from("libreoffice"),
                PathBuf::from("soffice")
            ]
        );
        assert_eq!(candidates(Some(Path::new("soffice"))).len(), 2);
        assert_eq!(candidates(None).len(), 2);
    }

    #[test]
    fn output_named_after_input_stem() {
        assert_eq!(
            expected_output(Path::new("/u/1/Q3 budget.xlsx"), Path::new("/u/1/.office-x")),
            PathBuf::from("/u/1/.office-x/Q3 budget.pdf")
        );
        assert_eq!(
            expected_output(Path::new("report.v2.docx"), Path::new("out")),
            PathBuf::from("out/report.v2.pdf")
        );
    }

    #[tokio::test]
    async fn missing_executables_report_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.docx");
        std::fs::write(&input, b"x").unwrap();
        let fake = dir.path().join("no-such-office");

        // Only the configured path is guaranteed absent; skip when a real
        // LibreOffice is installed on the test machine.
        if which_exists("libreoffice") || which_exists("soffice") {
            return;
        }
        let err = convert_to_pdf(&input, &dir.path().join("a.pdf"), Some(&fake), Duration::from_secs(5))
            .await
            .unwrap_err();
        match err {
            ConvertError::OfficeUnavailable { tried } => assert_eq!(tried.len(), 3),
            other => panic!("unexpected error {other:?}"),
        }
    }

    fn which_exists(name: &str) -> bool {
        std::env::var_os("PATH")
            .map(|paths| std::env::split_paths(&paths).any(|p| p.join(name).is_file()))
            .unwrap_or(false)
    }
}
