//! In-memory extraction of uploaded plugin archives.

use std::io::{Cursor, Read};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use zip::ZipArchive;

use super::{AnalyzerError, PackageFile};

/// Extraction caps.
#[derive(Debug, Clone, Copy)]
pub struct ExtractLimits {
    /// Maximum number of entries.
    pub max_files: usize,
    /// Maximum total uncompressed size.
    pub max_total_bytes: u64,
}

/// Read every regular file of a zip archive.
pub fn extract_zip(bytes: &[u8], limits: ExtractLimits) -> Result<Vec<PackageFile>, AnalyzerError> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|e| AnalyzerError::Archive(e.to_string()))?;

    if archive.len() > limits.max_files {
        return Err(AnalyzerError::TooManyFiles {
            count: archive.len(),
            limit: limits.max_files,
        });
    }

    let mut files = Vec::new();
    let mut budget = ByteBudget::new(limits.max_total_bytes);

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| AnalyzerError::Archive(e.to_string()))?;

        let path = match entry.enclosed_name() {
            Some(path) => path.to_path_buf(),
            None => return Err(AnalyzerError::UnsafePath(entry.name().to_string())),
        };
        if entry.is_dir() {
            continue;
        }

        budget.check_declared(entry.size())?;
        let contents = budget.read(&mut entry)?;
        files.push(PackageFile { path, contents });
    }

    Ok(files)
}

/// Read every regular file of a gzip-compressed tarball. Links and other
/// special entries are skipped.
pub fn extract_tar_gz(
    bytes: &[u8],
    limits: ExtractLimits,
) -> Result<Vec<PackageFile>, AnalyzerError> {
    let mut archive = tar::Archive::new(GzDecoder::new(Cursor::new(bytes)));
    let entries = archive
        .entries()
        .map_err(|e| AnalyzerError::Archive(e.to_string()))?;

    let mut files = Vec::new();
    let mut count = 0usize;
    let mut budget = ByteBudget::new(limits.max_total_bytes);

    for entry in entries {
        let mut entry = entry.map_err(|e| AnalyzerError::Archive(e.to_string()))?;

        count += 1;
        if count > limits.max_files {
            return Err(AnalyzerError::TooManyFiles {
                count,
                limit: limits.max_files,
            });
        }

        let raw = entry
            .path()
            .map_err(|e| AnalyzerError::Archive(e.to_string()))?
            .into_owned();
        let path = enclosed(&raw)
            .ok_or_else(|| AnalyzerError::UnsafePath(raw.display().to_string()))?;

        if !entry.header().entry_type().is_file() {
            continue;
        }

        budget.check_declared(entry.size())?;
        let contents = budget.read(&mut entry)?;
        files.push(PackageFile { path, contents });
    }

    Ok(files)
}

/// A relative path with no `..`, root, or prefix components.
pub fn enclosed(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    (!out.as_os_str().is_empty()).then_some(out)
}

/// Decompressed bytes still allowed across a whole archive. Entry headers
/// are only a hint; the budget is charged for what is actually read.
#[derive(Debug, Clone, Copy)]
struct ByteBudget {
    limit: u64,
    used: u64,
}

impl ByteBudget {
    fn new(limit: u64) -> Self {
        Self { limit, used: 0 }
    }

    fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.used)
    }

    fn exceeded(&self) -> AnalyzerError {
        AnalyzerError::ExtractedTooLarge { limit: self.limit }
    }

    /// Fail early when the declared size alone does not fit.
    fn check_declared(&self, size: u64) -> Result<(), AnalyzerError> {
        if size > self.remaining() {
            return Err(self.exceeded());
        }
        Ok(())
    }

    /// Read one entry, never buffering more than the remaining budget.
    fn read<R: Read>(&mut self, reader: &mut R) -> Result<Vec<u8>, AnalyzerError> {
        let remaining = self.remaining();
        let mut contents = Vec::new();
        reader
            .take(remaining.saturating_add(1))
            .read_to_end(&mut contents)
            .map_err(|e| AnalyzerError::Archive(e.to_string()))?;
        let read = contents.len() as u64;
        if read > remaining {
            return Err(self.exceeded());
        }
        self.used += read;
        Ok(contents)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Write;

    use super::*;

    const LIMITS: ExtractLimits = ExtractLimits {
        max_files: 10,
        max_total_bytes: 1024,
    };

    pub(crate) fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            writer
                .start_file(*name, zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    pub(crate) fn tar_gz_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn test_zip_roundtrip_paths() {
        let bytes = zip_bytes(&[("pkg/plugin.json", b"{}"), ("pkg/run.py", b"print(1)")]);
        let files = extract_zip(&bytes, LIMITS).unwrap();
        let paths: Vec<_> = files.iter().map(|f| f.path.clone()).collect();
        assert_eq!(
            paths,
            vec![PathBuf::from("pkg/plugin.json"), PathBuf::from("pkg/run.py")]
        );
    }

    #[test]
    fn test_zip_traversal_rejected() {
        let bytes = zip_bytes(&[("../evil.py", b"x")]);
        assert!(matches!(
            extract_zip(&bytes, LIMITS),
            Err(AnalyzerError::UnsafePath(_))
        ));
    }

    #[test]
    fn test_zip_caps() {
        let many: Vec<(String, Vec<u8>)> =
            (0..11).map(|i| (format!("f{i}.txt"), vec![b'a'])).collect();
        let refs: Vec<(&str, &[u8])> = many
            .iter()
            .map(|(n, d)| (n.as_str(), d.as_slice()))
            .collect();
        assert!(matches!(
            extract_zip(&zip_bytes(&refs), LIMITS),
            Err(AnalyzerError::TooManyFiles { .. })
        ));

        let big = vec![b'a'; 2048];
        assert!(matches!(
            extract_zip(&zip_bytes(&[("big.bin", &big)]), LIMITS),
            Err(AnalyzerError::ExtractedTooLarge { .. })
        ));
    }

    #[test]
    fn test_budget_shared_across_entries() {
        let half = vec![b'a'; 600];
        assert!(matches!(
            extract_zip(&zip_bytes(&[("a.bin", &half), ("b.bin", &half)]), LIMITS),
            Err(AnalyzerError::ExtractedTooLarge { limit: 1024 })
        ));
        assert!(matches!(
            extract_tar_gz(&tar_gz_bytes(&[("a.bin", &half), ("b.bin", &half)]), LIMITS),
            Err(AnalyzerError::ExtractedTooLarge { limit: 1024 })
        ));
    }

    #[test]
    fn test_budget_charges_bytes_read_not_declared() {
        // Entries whose headers understate their size still draw on one budget.
        let mut budget = ByteBudget::new(100);
        budget.check_declared(10).unwrap();
        assert_eq!(budget.read(&mut Cursor::new(vec![b'x'; 90])).unwrap().len(), 90);
        budget.check_declared(10).unwrap();
        assert!(matches!(
            budget.read(&mut Cursor::new(vec![b'y'; 90])),
            Err(AnalyzerError::ExtractedTooLarge { limit: 100 })
        ));
        assert_eq!(budget.remaining(), 10);
    }

    #[test]
    fn test_tar_gz() {
        let bytes = tar_gz_bytes(&[("plugin.json", b"{}"), ("main.js", b"//")]);
        let files = extract_tar_gz(&bytes, LIMITS).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[1].contents, b"//");
    }

    #[test]
    fn test_enclosed() {
        assert_eq!(enclosed(Path::new("./a/b")), Some(PathBuf::from("a/b")));
        assert_eq!(enclosed(Path::new("a/../b")), None);
        assert_eq!(enclosed(Path::new("/etc/passwd")), None);
        assert_eq!(enclosed(Path::new(".")), None);
    }
}
