//! Build-context packaging.
//!
//! Packages a build-context directory into a gzipped tar stream for the
//! runtime's image-build endpoint, honoring `.dockerignore` rules unioned
//! from a conservative built-in set plus `.dockerignore` files discovered
//! in the context root and the Dockerfile's directory when nested under
//! the context.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;

/// Built-in ignore patterns applied to every build context.
const BUILTIN_IGNORES: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    ".DS_Store",
    "node_modules",
    "target",
];

/// A single ignore rule.
#[derive(Debug, Clone)]
struct IgnorePattern {
    pattern: String,
    negate: bool,
}

/// Ordered set of ignore rules; the last matching rule wins.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    patterns: Vec<IgnorePattern>,
}

impl IgnoreRules {
    /// Builds the rule set for a context directory.
    ///
    /// Unions the built-in set with `.dockerignore` files from the
    /// context root and, when the Dockerfile sits in a subdirectory of
    /// the context, from that subdirectory as well.
    #[must_use]
    pub fn for_context(context: &Path, dockerfile: &Path) -> Self {
        let mut rules = Self::default();
        for builtin in BUILTIN_IGNORES {
            rules.add_line(builtin);
        }
        rules.load_file(&context.join(".dockerignore"));
        if let Some(dockerfile_dir) = dockerfile.parent() {
            if dockerfile_dir != context && dockerfile_dir.starts_with(context) {
                rules.load_file(&dockerfile_dir.join(".dockerignore"));
            }
        }
        rules
    }

    /// Parses ignore lines from a file, silently skipping a missing one.
    fn load_file(&mut self, path: &Path) {
        let Ok(content) = fs::read_to_string(path) else {
            return;
        };
        for line in content.lines() {
            self.add_line(line);
        }
    }

    /// Adds one ignore line; comments and blanks are skipped.
    pub fn add_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return;
        }
        let (negate, pattern) = match line.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, line),
        };
        let pattern = pattern.trim_matches('/').replace('\\', "/");
        if pattern.is_empty() {
            return;
        }
        self.patterns.push(IgnorePattern { pattern, negate });
    }

    /// True when the relative path (unix separators) is excluded.
    #[must_use]
    pub fn is_ignored(&self, rel_path: &str) -> bool {
        let mut ignored = false;
        for rule in &self.patterns {
            if pattern_matches(&rule.pattern, rel_path) {
                ignored = !rule.negate;
            }
        }
        ignored
    }
}

/// Matches one dockerignore pattern against a relative path.
///
/// Supports exact matches, directory prefixes, `*` within a segment and
/// `**` across segments.
fn pattern_matches(pattern: &str, path: &str) -> bool {
    if pattern == path {
        return true;
    }
    // Directory pattern: excludes everything underneath.
    if !pattern.contains('*') {
        return path.starts_with(&format!("{pattern}/"));
    }
    if glob_match(pattern, path) {
        return true;
    }
    // A wildcard directory pattern also excludes its contents.
    path.split('/').enumerate().any(|(i, _)| {
        let prefix: Vec<&str> = path.split('/').take(i + 1).collect();
        glob_match(pattern, &prefix.join("/"))
    })
}

/// Minimal glob matcher: `*` matches within a segment, `**` spans them.
fn glob_match(pattern: &str, text: &str) -> bool {
    fn inner(p: &[char], t: &[char]) -> bool {
        match p.first() {
            None => t.is_empty(),
            Some('*') => {
                let deep = p.len() >= 2 && p[1] == '*';
                // `**/` matches zero or more whole directories.
                let rest = if deep && p.get(2) == Some(&'/') {
                    &p[3..]
                } else if deep {
                    &p[2..]
                } else {
                    &p[1..]
                };
                let mut idx = 0;
                loop {
                    if inner(rest, &t[idx..]) {
                        return true;
                    }
                    if idx >= t.len() || (!deep && t[idx] == '/') {
                        return false;
                    }
                    idx += 1;
                }
            }
            Some(c) => !t.is_empty() && t[0] == *c && inner(&p[1..], &t[1..]),
        }
    }
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    inner(&p, &t)
}

/// Normalizes the Dockerfile path relative to the build context, with
/// unix separators as the runtime expects.
pub fn dockerfile_relative(context: &Path, dockerfile: &Path) -> io::Result<String> {
    let rel = dockerfile.strip_prefix(context).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "Dockerfile {} is not inside build context {}",
                dockerfile.display(),
                context.display()
            ),
        )
    })?;
    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    Ok(parts.join("/"))
}

/// Packages the context directory into a gzipped tar archive.
///
/// The Dockerfile is always included even when an ignore rule matches it.
///
/// # Errors
/// Returns error when the context cannot be read or archived.
pub fn pack_context(context: &Path, dockerfile: &Path) -> io::Result<Vec<u8>> {
    if !context.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("build context {} is not a directory", context.display()),
        ));
    }
    let rules = IgnoreRules::for_context(context, dockerfile);
    let dockerfile_rel = dockerfile_relative(context, dockerfile)?;

    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(false);

    let mut stack: Vec<PathBuf> = vec![context.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let mut entries: Vec<_> = fs::read_dir(&dir)?.collect::<Result<_, _>>()?;
        entries.sort_by_key(|e| e.file_name());
        for entry in entries {
            let path = entry.path();
            let rel = match dockerfile_relative(context, &path) {
                Ok(rel) => rel,
                Err(_) => continue,
            };
            let keep = rel == dockerfile_rel || !rules.is_ignored(&rel);
            if !keep {
                continue;
            }
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                stack.push(path);
            } else if file_type.is_file() {
                let mut file = fs::File::open(&path)?;
                builder.append_file(&rel, &mut file)?;
            }
        }
    }

    let encoder = builder.into_inner()?;
    encoder.finish()
}
