//! Static scanning of Python and JavaScript plugin sources.

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Source language of a script plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptLanguage {
    /// Run with `python3`.
    Python,
    /// Run with `node`.
    JavaScript,
}

impl ScriptLanguage {
    /// Language of `path` judged by its extension.
    pub fn from_path(path: &str) -> Option<Self> {
        let lower = path.to_ascii_lowercase();
        if lower.ends_with(".py") {
            Some(Self::Python)
        } else if lower.ends_with(".js") {
            Some(Self::JavaScript)
        } else {
            None
        }
    }

    /// Interpreter executable.
    pub fn interpreter(&self) -> &'static str {
        match self {
            Self::Python => "python3",
            Self::JavaScript => "node",
        }
    }
}

const PYTHON_STDLIB: &[&str] = &[
    "abc", "argparse", "array", "ast", "asyncio", "base64", "binascii", "bisect", "builtins",
    "calendar", "collections", "concurrent", "contextlib", "copy", "csv", "ctypes", "dataclasses",
    "datetime", "decimal", "difflib", "email", "enum", "errno", "fnmatch", "fractions",
    "functools", "gc", "getpass", "glob", "gzip", "hashlib", "heapq", "hmac", "html", "http",
    "io", "ipaddress", "itertools", "json", "logging", "marshal", "math", "mimetypes",
    "multiprocessing", "operator", "os", "pathlib", "pickle", "platform", "pprint", "queue",
    "random", "re", "secrets", "select", "shlex", "shutil", "signal", "socket", "sqlite3",
    "ssl", "stat", "statistics", "string", "struct", "subprocess", "sys", "tarfile", "tempfile",
    "textwrap", "threading", "time", "timeit", "traceback", "types", "typing", "unicodedata",
    "unittest", "urllib", "uuid", "warnings", "weakref", "xml", "zipfile", "zlib",
];

const NODE_BUILTINS: &[&str] = &[
    "assert", "buffer", "child_process", "cluster", "crypto", "dgram", "dns", "events", "fs",
    "http", "http2", "https", "net", "os", "path", "perf_hooks", "process", "querystring",
    "readline", "stream", "string_decoder", "timers", "tls", "tty", "url", "util", "v8", "vm",
    "worker_threads", "zlib",
];

const PYTHON_SENSITIVE: &[&str] = &[
    "os", "sys", "subprocess", "shutil", "socket", "ctypes", "pickle", "marshal",
];

const NODE_SENSITIVE: &[&str] = &["child_process", "fs", "net"];

/// Findings for one or more scanned sources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    /// Metadata assignments or doc tags, keyed by lower-case field name.
    pub metadata: BTreeMap<String, String>,
    /// Third-party modules imported.
    pub modules: BTreeSet<String>,
    /// Canonical names of credential patterns found.
    pub api_keys: BTreeSet<String>,
    /// Audit findings.
    pub warnings: BTreeSet<String>,
}

impl ScanResult {
    /// Fold `other` into `self`. Metadata already present is kept.
    pub fn merge(&mut self, other: ScanResult) {
        for (key, value) in other.metadata {
            self.metadata.entry(key).or_insert(value);
        }
        self.modules.extend(other.modules);
        self.api_keys.extend(other.api_keys);
        self.warnings.extend(other.warnings);
    }
}

/// Compiled patterns for source scanning.
#[derive(Debug)]
pub struct ScriptScanner {
    py_metadata: Regex,
    py_import: Regex,
    js_tag: Regex,
    js_import: Regex,
    dangerous_call: Regex,
    api_keys: Vec<(&'static str, Regex)>,
}

impl ScriptScanner {
    /// Compile every pattern.
    pub fn new() -> Result<Self, regex::Error> {
        let api_keys = [
            ("api_key", r"(?i)api[_-]?key"),
            ("api_secret", r"(?i)api[_-]?secret"),
            ("token", r"(?i)token"),
            ("password", r"(?i)password"),
            ("auth_key", r"(?i)auth[_-]?key"),
        ]
        .into_iter()
        .map(|(name, pattern)| Regex::new(pattern).map(|re| (name, re)))
        .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            py_metadata: Regex::new(
                r#"(?m)^\s*PLUGIN_(NAME|DESCRIPTION|VERSION|AUTHOR|CATEGORY)\s*=\s*["']([^"'\r\n]*)["']"#,
            )?,
            py_import: Regex::new(
                r"(?m)^\s*(?:from\s+([A-Za-z_][\w.]*)\s+import\b|import\s+([A-Za-z_][\w.]*(?:\s+as\s+\w+)?(?:\s*,\s*[A-Za-z_][\w.]*(?:\s+as\s+\w+)?)*))",
            )?,
            js_tag: Regex::new(r"@(name|description|version)[ \t]+([^\r\n]+)")?,
            js_import: Regex::new(
                r#"(?:require\(\s*['"]([^'"]+)['"]\s*\)|\bfrom\s+['"]([^'"]+)['"]|\bimport\s+['"]([^'"]+)['"])"#,
            )?,
            dangerous_call: Regex::new(r"\b(eval|exec|compile|system|popen)\s*\(")?,
            api_keys,
        })
    }

    /// Scan one source file.
    pub fn scan(&self, language: ScriptLanguage, source: &str) -> ScanResult {
        let mut result = match language {
            ScriptLanguage::Python => self.scan_python(source),
            ScriptLanguage::JavaScript => self.scan_javascript(source),
        };

        for (name, pattern) in &self.api_keys {
            if pattern.is_match(source) {
                result.api_keys.insert((*name).to_string());
            }
        }
        for caps in self.dangerous_call.captures_iter(source) {
            result
                .warnings
                .insert(format!("Uses potentially dangerous call: {}()", &caps[1]));
        }
        result
    }

    fn scan_python(&self, source: &str) -> ScanResult {
        let mut result = ScanResult::default();

        for caps in self.py_metadata.captures_iter(source) {
            let value = caps[2].trim();
            if !value.is_empty() {
                result
                    .metadata
                    .entry(caps[1].to_ascii_lowercase())
                    .or_insert_with(|| value.to_string());
            }
        }

        let mut imported = BTreeSet::new();
        for caps in self.py_import.captures_iter(source) {
            if let Some(module) = caps.get(1) {
                imported.insert(top_level(module.as_str(), '.').to_string());
            } else if let Some(list) = caps.get(2) {
                for item in list.as_str().split(',') {
                    if let Some(module) = item.split_whitespace().next() {
                        imported.insert(top_level(module, '.').to_string());
                    }
                }
            }
        }

        for module in imported {
            if PYTHON_SENSITIVE.contains(&module.as_str()) {
                result
                    .warnings
                    .insert(format!("Imports potentially dangerous module: {module}"));
            }
            if !PYTHON_STDLIB.contains(&module.as_str()) {
                result.modules.insert(module);
            }
        }
        result
    }

    fn scan_javascript(&self, source: &str) -> ScanResult {
        let mut result = ScanResult::default();

        for caps in self.js_tag.captures_iter(source) {
            let value = caps[2].trim().trim_end_matches("*/").trim();
            if !value.is_empty() {
                result
                    .metadata
                    .entry(caps[1].to_string())
                    .or_insert_with(|| value.to_string());
            }
        }

        for caps in self.js_import.captures_iter(source) {
            let Some(specifier) = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)) else {
                continue;
            };
            let specifier = specifier.as_str();
            if specifier.starts_with('.') || specifier.starts_with('/') {
                continue;
            }

            let (explicit_builtin, specifier) = match specifier.strip_prefix("node:") {
                Some(rest) => (true, rest),
                None => (false, specifier),
            };
            let module = js_package(specifier);

            if NODE_SENSITIVE.contains(&module.as_str()) {
                result
                    .warnings
                    .insert(format!("Imports potentially dangerous module: {module}"));
            }
            if !explicit_builtin && !NODE_BUILTINS.contains(&module.as_str()) {
                result.modules.insert(module);
            }
        }
        result
    }
}

fn top_level(module: &str, separator: char) -> &str {
    module.split(separator).next().unwrap_or(module)
}

/// Package name of an import specifier: `@scope/pkg` or `pkg`.
fn js_package(specifier: &str) -> String {
    let mut parts = specifier.split('/');
    match (parts.next(), parts.next()) {
        (Some(scope), Some(name)) if scope.starts_with('@') => format!("{scope}/{name}"),
        (Some(name), _) => name.to_string(),
        _ => specifier.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PYTHON: &str = r#"
import os, json
import requests as rq
from PIL import Image
from . import helpers
import numpy.linalg

PLUGIN_NAME = "QR Generator"
PLUGIN_VERSION = '2.1.0'
PLUGIN_CATEGORY = "Utility"

def run(ctx):
    key = ctx.get("api_key")
    return eval("1 + 1")
"#;

    const JAVASCRIPT: &str = r#"
/**
 * @name Word Counter
 * @description Counts words in text
 * @version 0.3.0
 */
const fs = require('fs');
const axios = require("axios");
const util = require('./util');
import { z } from "zod";
import sub from "@scope/pkg/sub";
import path from "node:path";
"#;

    fn scanner() -> ScriptScanner {
        ScriptScanner::new().unwrap()
    }

    #[test]
    fn test_python_scan() {
        let r = scanner().scan(ScriptLanguage::Python, PYTHON);
        assert_eq!(r.metadata["name"], "QR Generator");
        assert_eq!(r.metadata["version"], "2.1.0");
        assert_eq!(r.metadata["category"], "Utility");
        assert!(!r.metadata.contains_key("author"));

        let modules: Vec<&str> = r.modules.iter().map(String::as_str).collect();
        assert_eq!(modules, vec!["PIL", "numpy", "requests"]);

        assert!(r.api_keys.contains("api_key"));
        assert!(r
            .warnings
            .contains("Imports potentially dangerous module: os"));
        assert!(r
            .warnings
            .contains("Uses potentially dangerous call: eval()"));
    }

    #[test]
    fn test_javascript_scan() {
        let r = scanner().scan(ScriptLanguage::JavaScript, JAVASCRIPT);
        assert_eq!(r.metadata["name"], "Word Counter");
        assert_eq!(r.metadata["description"], "Counts words in text");
        assert_eq!(r.metadata["version"], "0.3.0");

        let modules: Vec<&str> = r.modules.iter().map(String::as_str).collect();
        assert_eq!(modules, vec!["@scope/pkg", "axios", "zod"]);
        assert!(r
            .warnings
            .contains("Imports potentially dangerous module: fs"));
        assert!(r.api_keys.is_empty());
    }

    #[test]
    fn test_credential_patterns_are_case_insensitive() {
        let r = scanner().scan(ScriptLanguage::Python, "API-SECRET = 1\nAuthKey = 2\n");
        let keys: Vec<&str> = r.api_keys.iter().map(String::as_str).collect();
        assert_eq!(keys, vec!["api_secret", "auth_key"]);
    }

    #[test]
    fn test_merge_keeps_first_metadata() {
        let mut a = scanner().scan(ScriptLanguage::Python, "PLUGIN_NAME = \"A\"\n");
        let b = scanner().scan(ScriptLanguage::Python, "PLUGIN_NAME = \"B\"\nimport yaml\n");
        a.merge(b);
        assert_eq!(a.metadata["name"], "A");
        assert!(a.modules.contains("yaml"));
    }

    #[test]
    fn test_language_from_path() {
        assert_eq!(ScriptLanguage::from_path("a/Main.PY"), Some(ScriptLanguage::Python));
        assert_eq!(ScriptLanguage::from_path("x.js"), Some(ScriptLanguage::JavaScript));
        assert_eq!(ScriptLanguage::from_path("x.json"), None);
    }
}
