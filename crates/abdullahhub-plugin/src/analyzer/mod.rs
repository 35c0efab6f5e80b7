//! Uploaded package analysis.
//!
//! A package is a bare manifest, a single Python or JavaScript script, or a
//! zip/tar.gz archive. Analysis resolves the manifest, scans the sources for
//! third-party modules, credential patterns and risky calls, and produces the
//! file set to install under `<plugins>/<slug>/`. Nothing is executed.

pub mod archive;
pub mod script;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use abdullahhub_core::config::PluginConfig;
use abdullahhub_core::error::{AppError, ErrorKind};

use crate::error::PluginError;
use crate::manifest::{EntryPoint, MANIFEST_FILE, PluginManifest, RuntimeKind, slugify};

use self::archive::ExtractLimits;
pub use self::script::{ScanResult, ScriptLanguage, ScriptScanner};

/// Archive entry cap.
pub const MAX_ARCHIVE_FILES: usize = 1000;

/// Reasons a package is refused.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// Extension not accepted.
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    /// Upload exceeds the size cap.
    #[error("Package too large: {size} bytes (limit {limit})")]
    TooLarge { size: usize, limit: usize },

    /// Archive has too many entries.
    #[error("Archive contains too many files: {count} (limit {limit})")]
    TooManyFiles { count: usize, limit: usize },

    /// Archive expands past the size cap.
    #[error("Archive expands beyond {limit} bytes")]
    ExtractedTooLarge { limit: u64 },

    /// Archive entry escapes the extraction root.
    #[error("Unsafe path in archive: {0}")]
    UnsafePath(String),

    /// No manifest and no script to derive one from.
    #[error("No plugin.json, .py or .js file found in package")]
    NoPluginFound,

    /// The plugin name yields an empty slug.
    #[error("Cannot derive a plugin identifier from '{0}'")]
    InvalidName(String),

    /// Corrupt archive.
    #[error("Invalid archive: {0}")]
    Archive(String),

    /// Invalid manifest.
    #[error(transparent)]
    Manifest(#[from] PluginError),

    /// Scanner pattern failed to compile.
    #[error("Invalid scanner pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl From<AnalyzerError> for AppError {
    fn from(err: AnalyzerError) -> Self {
        match err {
            AnalyzerError::Pattern(_) => {
                AppError::with_source(ErrorKind::Internal, err.to_string(), err)
            }
            AnalyzerError::Manifest(PluginError::Io(_)) => {
                AppError::with_source(ErrorKind::Storage, err.to_string(), err)
            }
            _ => AppError::validation(err.to_string()),
        }
    }
}

/// Upload and extraction caps.
#[derive(Debug, Clone)]
pub struct AnalyzerLimits {
    /// Maximum package size.
    pub max_upload_bytes: usize,
    /// Maximum archive entries.
    pub max_files: usize,
    /// Maximum total extracted size.
    pub max_extracted_bytes: u64,
    /// Accepted extensions, without the leading dot.
    pub allowed_extensions: Vec<String>,
}

impl AnalyzerLimits {
    /// Limits derived from the plugin configuration. Archives may expand to
    /// four times the upload cap.
    pub fn from_config(config: &PluginConfig) -> Self {
        Self {
            max_upload_bytes: config.max_upload_bytes,
            max_files: MAX_ARCHIVE_FILES,
            max_extracted_bytes: (config.max_upload_bytes as u64).saturating_mul(4),
            allowed_extensions: config.allowed_extensions.clone(),
        }
    }
}

impl Default for AnalyzerLimits {
    fn default() -> Self {
        Self::from_config(&PluginConfig::default())
    }
}

/// A file to write into the plugin directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageFile {
    /// Path relative to the plugin directory.
    pub path: PathBuf,
    /// File contents.
    pub contents: Vec<u8>,
}

/// Result of analysing a package.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// Derived plugin identifier.
    pub slug: String,
    /// Resolved manifest.
    pub manifest: PluginManifest,
    /// Script language, when the entry point is a script.
    pub language: Option<ScriptLanguage>,
    /// Third-party modules referenced by the sources.
    pub modules: Vec<String>,
    /// Credential patterns found in the sources.
    pub api_keys_detected: Vec<String>,
    /// Audit findings.
    pub warnings: Vec<String>,
    /// SHA-256 of the uploaded bytes, hex encoded.
    pub file_hash: String,
    /// Uploaded size.
    pub file_size: usize,
    /// Files to install.
    #[serde(skip)]
    pub files: Vec<PackageFile>,
}

impl AnalysisReport {
    /// Relative paths of the files to install.
    pub fn file_paths(&self) -> Vec<String> {
        self.files
            .iter()
            .map(|f| f.path.to_string_lossy().to_string())
            .collect()
    }

    /// Write the file set into `dir`, creating it if needed.
    pub async fn write_to(&self, dir: &Path) -> Result<(), std::io::Error> {
        tokio::fs::create_dir_all(dir).await?;
        for file in &self.files {
            let target = dir.join(&file.path);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&target, &file.contents).await?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PackageKind {
    Manifest,
    Script(ScriptLanguage),
    Zip,
    TarGz,
}

impl PackageKind {
    fn detect(filename: &str) -> Option<(Self, &'static str)> {
        let lower = filename.to_ascii_lowercase();
        let kinds = [
            (".tar.gz", Self::TarGz, "tar.gz"),
            (".tgz", Self::TarGz, "tgz"),
            (".zip", Self::Zip, "zip"),
            (".json", Self::Manifest, "json"),
            (".py", Self::Script(ScriptLanguage::Python), "py"),
            (".js", Self::Script(ScriptLanguage::JavaScript), "js"),
        ];
        kinds
            .into_iter()
            .find(|(suffix, _, _)| lower.ends_with(suffix))
            .map(|(_, kind, ext)| (kind, ext))
    }
}

/// Inspects uploaded plugin packages.
#[derive(Debug)]
pub struct PluginAnalyzer {
    limits: AnalyzerLimits,
    scanner: ScriptScanner,
}

impl PluginAnalyzer {
    /// Create an analyzer with the given caps.
    pub fn new(limits: AnalyzerLimits) -> Result<Self, AnalyzerError> {
        Ok(Self {
            limits,
            scanner: ScriptScanner::new()?,
        })
    }

    /// Analyse an uploaded package. CPU bound; async callers should run it
    /// on a blocking thread.
    pub fn analyze(&self, filename: &str, bytes: &[u8]) -> Result<AnalysisReport, AnalyzerError> {
        if bytes.len() > self.limits.max_upload_bytes {
            return Err(AnalyzerError::TooLarge {
                size: bytes.len(),
                limit: self.limits.max_upload_bytes,
            });
        }

        let basename = Path::new(filename)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let (kind, ext) = PackageKind::detect(&basename)
            .filter(|(_, ext)| self.limits.allowed_extensions.iter().any(|a| a == ext))
            .ok_or_else(|| AnalyzerError::UnsupportedType(basename.clone()))?;
        let stem = basename[..basename.len() - ext.len() - 1].to_string();

        let resolved = match kind {
            PackageKind::Manifest => {
                let manifest = PluginManifest::parse(bytes, &stem)?;
                Resolved {
                    manifest,
                    language: None,
                    scan: ScanResult::default(),
                    files: vec![PackageFile {
                        path: PathBuf::from(MANIFEST_FILE),
                        contents: bytes.to_vec(),
                    }],
                    generated_manifest: false,
                }
            }
            PackageKind::Script(language) => {
                let file = PackageFile {
                    path: PathBuf::from(&basename),
                    contents: bytes.to_vec(),
                };
                self.from_script(&stem, language, file, Vec::new())
            }
            PackageKind::Zip => {
                let files = archive::extract_zip(bytes, self.extract_limits())?;
                self.from_archive(&stem, files)?
            }
            PackageKind::TarGz => {
                let files = archive::extract_tar_gz(bytes, self.extract_limits())?;
                self.from_archive(&stem, files)?
            }
        };

        self.finish(&stem, bytes, resolved)
    }

    fn extract_limits(&self) -> ExtractLimits {
        ExtractLimits {
            max_files: self.limits.max_files,
            max_total_bytes: self.limits.max_extracted_bytes,
        }
    }

    fn from_archive(
        &self,
        stem: &str,
        files: Vec<PackageFile>,
    ) -> Result<Resolved, AnalyzerError> {
        let files = strip_root(files);

        let manifest_bytes = files
            .iter()
            .find(|f| f.path == Path::new(MANIFEST_FILE))
            .map(|f| f.contents.clone());

        if let Some(bytes) = manifest_bytes {
            let manifest = PluginManifest::parse(&bytes, stem)?;
            let mut scan = ScanResult::default();
            for file in &files {
                if let Some(language) = ScriptLanguage::from_path(&file.path.to_string_lossy()) {
                    scan.merge(
                        self.scanner
                            .scan(language, &String::from_utf8_lossy(&file.contents)),
                    );
                }
            }
            let language = manifest
                .entry
                .as_ref()
                .and_then(|e| interpreter_language(&e.command));
            return Ok(Resolved {
                manifest,
                language,
                scan,
                files,
                generated_manifest: false,
            });
        }

        let mut scripts: Vec<(&PackageFile, ScriptLanguage)> = files
            .iter()
            .filter_map(|f| ScriptLanguage::from_path(&f.path.to_string_lossy()).map(|l| (f, l)))
            .collect();
        scripts.sort_by(|(a, la), (b, lb)| {
            (*la != ScriptLanguage::Python, &a.path).cmp(&(*lb != ScriptLanguage::Python, &b.path))
        });
        let (entry, language) = scripts
            .first()
            .map(|(f, l)| ((*f).clone(), *l))
            .ok_or(AnalyzerError::NoPluginFound)?;

        let others = files.into_iter().filter(|f| f.path != entry.path).collect();
        Ok(self.from_script(stem, language, entry, others))
    }

    fn from_script(
        &self,
        stem: &str,
        language: ScriptLanguage,
        entry: PackageFile,
        others: Vec<PackageFile>,
    ) -> Resolved {
        let source = String::from_utf8_lossy(&entry.contents);
        let scan = self.scanner.scan(language, &source);

        let mut manifest = PluginManifest::with_defaults(stem);
        let field = |key: &str| scan.metadata.get(key).cloned();
        if let Some(name) = field("name") {
            manifest.name = name;
        }
        if let Some(description) = field("description") {
            manifest.description = description;
        }
        if let Some(version) = field("version") {
            manifest.version = version;
        }
        if let Some(author) = field("author") {
            manifest.author = author;
        }
        if let Some(category) = field("category") {
            manifest.category = category;
        }
        manifest.runtime = RuntimeKind::Command;
        manifest.entry = Some(EntryPoint {
            command: language.interpreter().to_string(),
            args: vec![entry.path.to_string_lossy().to_string()],
        });
        manifest.requirements = vec![language.interpreter().to_string()];
        manifest.api_keys_required = scan.api_keys.iter().cloned().collect();

        let mut files = others;
        files.push(entry);
        Resolved {
            manifest,
            language: Some(language),
            scan,
            files,
            generated_manifest: true,
        }
    }

    fn finish(
        &self,
        stem: &str,
        bytes: &[u8],
        mut resolved: Resolved,
    ) -> Result<AnalysisReport, AnalyzerError> {
        resolved.manifest.validate()?;

        let slug = match slugify(&resolved.manifest.name) {
            s if !s.is_empty() => s,
            _ => slugify(stem),
        };
        if slug.is_empty() {
            return Err(AnalyzerError::InvalidName(resolved.manifest.name));
        }

        if resolved.generated_manifest {
            let contents = serde_json::to_vec_pretty(&resolved.manifest)
                .map_err(|e| PluginError::InvalidManifest(e.to_string()))?;
            resolved.files.retain(|f| f.path != Path::new(MANIFEST_FILE));
            resolved.files.push(PackageFile {
                path: PathBuf::from(MANIFEST_FILE),
                contents,
            });
        }
        resolved.files.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(AnalysisReport {
            slug,
            manifest: resolved.manifest,
            language: resolved.language,
            modules: resolved.scan.modules.into_iter().collect(),
            api_keys_detected: resolved.scan.api_keys.into_iter().collect(),
            warnings: resolved.scan.warnings.into_iter().collect(),
            file_hash: hex::encode(Sha256::digest(bytes)),
            file_size: bytes.len(),
            files: resolved.files,
        })
    }
}

struct Resolved {
    manifest: PluginManifest,
    language: Option<ScriptLanguage>,
    scan: ScanResult,
    files: Vec<PackageFile>,
    generated_manifest: bool,
}

fn interpreter_language(command: &str) -> Option<ScriptLanguage> {
    let name = Path::new(command).file_name()?.to_str()?;
    if name.starts_with("python") {
        Some(ScriptLanguage::Python)
    } else if name == "node" || name == "nodejs" {
        Some(ScriptLanguage::JavaScript)
    } else {
        None
    }
}

/// Drop a single shared top-level directory, unless the manifest already
/// sits at the archive root.
fn strip_root(files: Vec<PackageFile>) -> Vec<PackageFile> {
    if files.iter().any(|f| f.path == Path::new(MANIFEST_FILE)) {
        return files;
    }

    let roots: BTreeSet<PathBuf> = files
        .iter()
        .filter(|f| f.path.components().count() > 1)
        .filter_map(|f| f.path.components().next())
        .map(|c| PathBuf::from(c.as_os_str()))
        .collect();
    let nested = files.iter().all(|f| f.path.components().count() > 1);

    match (roots.len(), roots.into_iter().next()) {
        (1, Some(root)) if nested => files
            .into_iter()
            .filter_map(|f| {
                let path = f.path.strip_prefix(&root).ok()?.to_path_buf();
                Some(PackageFile {
                    path,
                    contents: f.contents,
                })
            })
            .collect(),
        _ => files,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::archive::tests::{tar_gz_bytes, zip_bytes};
    use super::*;

    fn analyzer() -> PluginAnalyzer {
        PluginAnalyzer::new(AnalyzerLimits::default()).unwrap()
    }

    fn file<'a>(report: &'a AnalysisReport, path: &str) -> &'a PackageFile {
        report
            .files
            .iter()
            .find(|f| f.path == Path::new(path))
            .unwrap()
    }

    #[test]
    fn test_python_script() {
        let src = b"PLUGIN_NAME = \"Text Stats\"\nPLUGIN_AUTHOR = \"Abdullah\"\nimport requests\n";
        let report = analyzer().analyze("stats.py", src).unwrap();

        assert_eq!(report.slug, "text-stats");
        assert_eq!(report.language, Some(ScriptLanguage::Python));
        assert_eq!(report.manifest.author, "Abdullah");
        assert_eq!(report.manifest.requirements, vec!["python3"]);
        let entry = report.manifest.entry.clone().unwrap();
        assert_eq!(entry.command, "python3");
        assert_eq!(entry.args, vec!["stats.py"]);
        assert_eq!(report.modules, vec!["requests"]);
        assert_eq!(report.file_paths(), vec!["plugin.json", "stats.py"]);
        assert_eq!(report.file_hash, hex::encode(Sha256::digest(src)));

        let written = PluginManifest::parse(&file(&report, "plugin.json").contents, "x").unwrap();
        assert_eq!(written, report.manifest);
    }

    #[test]
    fn test_javascript_script_falls_back_to_stem() {
        let report = analyzer()
            .analyze("uploads/Word Count.js", b"console.log(1)")
            .unwrap();
        assert_eq!(report.slug, "word-count");
        assert_eq!(report.manifest.name, "Word Count");
        assert_eq!(report.manifest.requirements, vec!["node"]);
    }

    #[test]
    fn test_bare_manifest() {
        let manifest = json!({"name": "Remove BG", "runtime": "builtin"}).to_string();
        let report = analyzer().analyze("removebg.json", manifest.as_bytes()).unwrap();
        assert_eq!(report.slug, "remove-bg");
        assert_eq!(report.manifest.runtime, RuntimeKind::Builtin);
        assert_eq!(report.language, None);
        assert_eq!(file(&report, "plugin.json").contents, manifest.as_bytes());
    }

    #[test]
    fn test_zip_with_nested_manifest() {
        let manifest = json!({
            "name": "Resizer",
            "entry": {"command": "python3", "args": ["main.py"]}
        })
        .to_string();
        let bytes = zip_bytes(&[
            ("resizer/plugin.json", manifest.as_bytes()),
            ("resizer/main.py", b"import subprocess\nimport pillow_simd\n"),
            ("resizer/lib/util.py", b"x = 1\n"),
        ]);
        let report = analyzer().analyze("resizer.zip", &bytes).unwrap();

        assert_eq!(report.slug, "resizer");
        assert_eq!(report.language, Some(ScriptLanguage::Python));
        assert_eq!(
            report.file_paths(),
            vec!["lib/util.py", "main.py", "plugin.json"]
        );
        assert_eq!(report.modules, vec!["pillow_simd"]);
        assert_eq!(
            report.warnings,
            vec!["Imports potentially dangerous module: subprocess"]
        );
    }

    #[test]
    fn test_tarball_without_manifest_prefers_python() {
        let bytes = tar_gz_bytes(&[
            ("a.js", b"// @name Js One\n"),
            ("z.py", b"PLUGIN_NAME = 'Py One'\n"),
        ]);
        let report = analyzer().analyze("bundle.tgz", &bytes).unwrap();
        assert_eq!(report.slug, "py-one");
        assert_eq!(report.manifest.entry.unwrap().args, vec!["z.py"]);
        assert_eq!(report.files.len(), 3);
    }

    #[test]
    fn test_rejections() {
        let analyzer = analyzer();
        assert!(matches!(
            analyzer.analyze("tool.exe", b"MZ"),
            Err(AnalyzerError::UnsupportedType(_))
        ));
        assert!(matches!(
            analyzer.analyze("empty.zip", &zip_bytes(&[("readme.txt", b"hi")])),
            Err(AnalyzerError::NoPluginFound)
        ));
        assert!(matches!(
            analyzer.analyze("broken.zip", b"not a zip"),
            Err(AnalyzerError::Archive(_))
        ));
        assert!(matches!(
            analyzer.analyze("bad.json", b"{\"entry\": 5}"),
            Err(AnalyzerError::Manifest(_))
        ));
        assert!(matches!(
            analyzer.analyze("___.py", b"PLUGIN_NAME = '***'\n"),
            Err(AnalyzerError::InvalidName(_))
        ));

        let small = PluginAnalyzer::new(AnalyzerLimits {
            max_upload_bytes: 4,
            ..AnalyzerLimits::default()
        })
        .unwrap();
        assert!(matches!(
            small.analyze("x.py", b"print(1)"),
            Err(AnalyzerError::TooLarge { size: 8, limit: 4 })
        ));
    }

    #[test]
    fn test_error_mapping() {
        let app: AppError = AnalyzerError::NoPluginFound.into();
        assert_eq!(app.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_write_to() {
        let dir = tempfile::tempdir().unwrap();
        let report = analyzer().analyze("hello.py", b"print('hi')\n").unwrap();
        let target = dir.path().join(&report.slug);
        report.write_to(&target).await.unwrap();
        assert!(target.join("hello.py").is_file());
        assert!(target.join("plugin.json").is_file());
    }
}
