//! Layout of the built-binary cache.
//!
//! A main package lands in
//! `<module>/@v/<version>/<package dir relative to module>/<binary>`, or
//! `<module>/@/<relative dir>/<binary>` when the module has no version (the
//! main module itself). Module paths never contain `@`, so the first element
//! starting with `@` always separates the module from the rest.
//!
//! Each path is escaped so the layout survives case-insensitive filesystems:
//! an uppercase ASCII letter `X` is written as `!x`, and `!` is not allowed in
//! the input.

use std::path::{Path, PathBuf};
use thiserror::Error;
use crate::resolve::{MainPackage, ModuleCoordinate};

pub const ESCAPE: char = '!';
pub const VERSION_MARKER: &str = "@v";
pub const UNVERSIONED_MARKER: &str = "@";

#[derive(Debug, Error, PartialEq)]
pub enum CacheError {
    #[error("failed to encode path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },
    #[error("failed to encode version {version:?}: {reason}")]
    InvalidVersion { version: String, reason: String },
    #[error("failed to decode {encoded:?}: {reason}")]
    InvalidEncoding { encoded: String, reason: String },
    #[error("package {import_path} is not inside module {module}")]
    OutsideModule { import_path: String, module: String },
}

/// Where one main package is built to.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheTarget {
    pub dir: PathBuf,
    pub binary: PathBuf,
}

impl CacheTarget {
    pub fn new(root: &Path, package: &MainPackage) -> Result<CacheTarget, CacheError> {
        let dir = root.join(relative_dir(&package.module, &package.import_path)?);
        let binary = dir.join(binary_name(&package.import_path));
        Ok(CacheTarget { dir, binary })
    }
}

/// File name `go install` gives the binary of `import_path`.
pub fn binary_name(import_path: &str) -> String {
    let base = import_path.rsplit('/').next().unwrap_or(import_path);
    format!("{}{}", base, std::env::consts::EXE_SUFFIX)
}

/// Cache directory of a package, relative to the cache root.
pub fn relative_dir(module: &ModuleCoordinate, import_path: &str) -> Result<PathBuf, CacheError> {
    let rel = package_subpath(&module.path, import_path)?;

    let mut dir = PathBuf::new();
    push_elements(&mut dir, &encode_path(&module.path)?);
    if module.version.is_empty() {
        dir.push(UNVERSIONED_MARKER);
    } else {
        dir.push(VERSION_MARKER);
        dir.push(encode_version(&module.version)?);
    }
    if !rel.is_empty() {
        push_elements(&mut dir, &encode_path(rel)?);
    }
    Ok(dir)
}

/// The part of `import_path` below `module_path`; empty for the module's root package.
fn package_subpath<'a>(module_path: &str, import_path: &'a str) -> Result<&'a str, CacheError> {
    let outside = || CacheError::OutsideModule {
        import_path: import_path.to_string(),
        module: module_path.to_string(),
    };
    let rest = import_path.strip_prefix(module_path).ok_or_else(outside)?;
    if rest.is_empty() {
        return Ok(rest);
    }
    rest.strip_prefix('/').ok_or_else(outside)
}

fn push_elements(dir: &mut PathBuf, encoded: &str) {
    for elem in encoded.split('/') {
        dir.push(elem);
    }
}

/// Escapes a slash-separated module or package path.
pub fn encode_path(path: &str) -> Result<String, CacheError> {
    let invalid = |reason: &str| CacheError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    };
    if path.is_empty() {
        return Err(invalid("empty string"));
    }
    if path.starts_with('/') || path.ends_with('/') {
        return Err(invalid("leading or trailing slash"));
    }
    for elem in path.split('/') {
        match elem {
            "" => return Err(invalid("empty path element")),
            "." | ".." => return Err(invalid("dot path element")),
            _ => {}
        }
    }
    if let Some(c) = path.chars().find(|c| !is_path_char(*c)) {
        return Err(invalid(&format!("invalid char {:?}", c)));
    }
    Ok(escape(path))
}

/// Escapes a module version so it can be used as one path element.
pub fn encode_version(version: &str) -> Result<String, CacheError> {
    let invalid = |reason: &str| CacheError::InvalidVersion {
        version: version.to_string(),
        reason: reason.to_string(),
    };
    if version.is_empty() {
        return Err(invalid("empty string"));
    }
    if version == "." || version == ".." {
        return Err(invalid("dot version"));
    }
    if let Some(c) = version.chars().find(|c| !is_version_char(*c)) {
        return Err(invalid(&format!("invalid char {:?}", c)));
    }
    Ok(escape(version))
}

/// Inverse of [`encode_path`] / [`encode_version`].
pub fn decode_path(encoded: &str) -> Result<String, CacheError> {
    let invalid = |reason: &str| CacheError::InvalidEncoding {
        encoded: encoded.to_string(),
        reason: reason.to_string(),
    };
    let mut out = String::with_capacity(encoded.len());
    let mut chars = encoded.chars();
    while let Some(c) = chars.next() {
        if c == ESCAPE {
            match chars.next() {
                Some(next) if next.is_ascii_lowercase() => out.push(next.to_ascii_uppercase()),
                _ => return Err(invalid("dangling escape")),
            }
        } else if c.is_ascii_uppercase() {
            return Err(invalid("unescaped uppercase letter"));
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_ascii_uppercase() {
            out.push(ESCAPE);
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn is_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~' | '+' | '/')
}

fn is_version_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '+')
}
