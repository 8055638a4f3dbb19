//! ZIP packaging for rendered pages.

use crate::error::ConvertError;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Write `files` into a new archive at `dest`, flat, under their file names.
///
/// Returns the number of entries written.
pub fn zip_files(files: &[PathBuf], dest: &Path) -> Result<usize, ConvertError> {
    let archive_err = |e: zip::result::ZipError| ConvertError::Archive(e.to_string());

    let out = File::create(dest).map_err(|e| ConvertError::io(dest, e))?;
    let mut zip = ZipWriter::new(BufWriter::new(out));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ConvertError::Archive(format!("'{}' has no file name", path.display())))?;
        zip.start_file(name, options).map_err(archive_err)?;
        let mut src = File::open(path).map_err(|e| ConvertError::io(path, e))?;
        io::copy(&mut src, &mut zip).map_err(|e| ConvertError::io(path, e))?;
    }

    zip.finish().map_err(archive_err)?;
    Ok(files.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn entries_keep_order_and_content() {
        let dir = tempfile::tempdir().unwrap();
        let pages: Vec<PathBuf> = (1..=3)
            .map(|i| {
                let p = dir.path().join(format!("page_{i:03}.png"));
                std::fs::write(&p, format!("page {i}")).unwrap();
                p
            })
            .collect();
        let dest = dir.path().join("doc_pages.zip");

        assert_eq!(zip_files(&pages, &dest).unwrap(), 3);

        let mut archive = zip::ZipArchive::new(File::open(&dest).unwrap()).unwrap();
        assert_eq!(archive.len(), 3);
        let mut second = archive.by_index(1).unwrap();
        assert_eq!(second.name(), "page_002.png");
        let mut body = String::new();
        second.read_to_string(&mut body).unwrap();
        assert_eq!(body, "page 2");
    }

    #[test]
    fn missing_source_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = zip_files(&[dir.path().join("nope.png")], &dir.path().join("x.zip")).unwrap_err();
        assert!(matches!(err, ConvertError::Io { .. }));
    }
}
