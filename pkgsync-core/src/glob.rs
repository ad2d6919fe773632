//! Glob expansion for source files and package directories.
//!
//! Supports `*`, `**`, `?`, `[...]`, `[!...]` and `{a,b}`. Patterns are
//! matched against `/`-separated paths relative to the working directory
//! (or against the full path for absolute patterns).

use std::path::{Path, PathBuf};

use regex::Regex;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::path_utils::normalize;

const SKIPPED_DIRS: &[&str] = &["node_modules", ".git"];

/// What kind of filesystem entry a pattern should yield.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

impl EntryKind {
    fn matches(self, path: &Path) -> bool {
        match self {
            EntryKind::File => path.is_file(),
            EntryKind::Directory => path.is_dir(),
        }
    }
}

/// One `/`-separated piece of a compiled glob.
#[derive(Debug, Clone)]
enum Segment {
    /// `**`: zero or more segments, none of them dotted.
    Globstar,
    Match {
        regex: Regex,
        /// Written with a leading `.`, so it may match dotfiles.
        dotted: bool,
    },
}

impl Segment {
    fn matches(&self, name: &str) -> bool {
        match self {
            Segment::Globstar => !name.starts_with('.'),
            Segment::Match { regex, dotted } => {
                (*dotted || !name.starts_with('.')) && regex.is_match(name)
            }
        }
    }
}

/// A compiled glob.
///
/// Braces are expanded up front; each alternative is matched segment by
/// segment. Wildcards never match a leading `.`, so dotfiles and
/// dot-directories are only found by patterns that spell the dot out.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    source: String,
    literal_prefix: String,
    remainder_depth: Option<usize>,
    alternatives: Vec<Vec<Segment>>,
}

impl GlobPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let source = clean(pattern);
        let invalid = |message: String| Error::InvalidGlob {
            pattern: pattern.to_string(),
            message,
        };

        let expanded = expand_braces(&source).map_err(|m| invalid(m.to_string()))?;
        let alternatives = expanded
            .iter()
            .map(|alternative| {
                alternative
                    .split('/')
                    .map(|segment| compile_segment(segment).map_err(&invalid))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        let segments: Vec<&str> = source.split('/').collect();
        let literal_len = segments
            .iter()
            .take_while(|segment| !has_magic(segment))
            .count();
        let literal_prefix = segments[..literal_len].join("/");

        let remainder_depth = if expanded.iter().any(|alternative| alternative.contains("**")) {
            None
        } else {
            expanded
                .iter()
                .map(|alternative| alternative.split('/').count().saturating_sub(literal_len))
                .max()
        };

        Ok(Self {
            source,
            literal_prefix,
            remainder_depth,
            alternatives,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_literal(&self) -> bool {
        self.remainder_depth == Some(0)
    }

    pub fn is_absolute(&self) -> bool {
        Path::new(&self.source).is_absolute()
    }

    /// Matches a `/`-separated path.
    pub fn matches(&self, path: &str) -> bool {
        let names: Vec<&str> = path.split('/').collect();
        self.alternatives
            .iter()
            .any(|segments| match_segments(segments, &names))
    }

    /// Expands the pattern relative to `cwd`. Results are sorted.
    pub fn expand(&self, cwd: &Path, kind: EntryKind) -> Vec<PathBuf> {
        let absolute = self.is_absolute();
        let anchor = if absolute { PathBuf::new() } else { cwd.to_path_buf() };

        if self.is_literal() {
            let path = normalize(&anchor.join(&self.source));
            return if kind.matches(&path) { vec![path] } else { Vec::new() };
        }

        let root = if self.literal_prefix.is_empty() {
            anchor.clone()
        } else {
            anchor.join(&self.literal_prefix)
        };
        if !root.is_dir() {
            return Vec::new();
        }

        let mut walker = WalkDir::new(&root).min_depth(1);
        if let Some(depth) = self.remainder_depth {
            walker = walker.max_depth(depth);
        }

        let mut matches: Vec<PathBuf> = walker
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !SKIPPED_DIRS
                        .iter()
                        .any(|skipped| entry.file_name() == *skipped)
            })
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.into_path())
            .filter(|path| {
                let candidate = if absolute {
                    to_slash(path)
                } else {
                    path.strip_prefix(&anchor).map(to_slash).unwrap_or_default()
                };
                self.matches(&candidate)
            })
            .filter(|path| kind.matches(path))
            .collect();

        matches.sort();
        matches
    }
}

/// Expands one file pattern; an empty result is not an error here.
pub fn expand_files(pattern: &str, cwd: &Path) -> Result<Vec<PathBuf>> {
    Ok(GlobPattern::new(pattern)?.expand(cwd, EntryKind::File))
}

/// Expands directory patterns relative to `cwd`.
///
/// Patterns starting with `!` remove matches of the other patterns. The result
/// is sorted and free of duplicates.
pub fn expand_dirs<S: AsRef<str>>(patterns: &[S], cwd: &Path) -> Result<Vec<PathBuf>> {
    let mut includes = Vec::new();
    let mut excludes = Vec::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        match pattern.strip_prefix('!') {
            Some(negated) => excludes.push(GlobPattern::new(negated)?),
            None => includes.push(GlobPattern::new(pattern)?),
        }
    }

    let mut dirs: Vec<PathBuf> = includes
        .iter()
        .flat_map(|glob| glob.expand(cwd, EntryKind::Directory))
        .filter(|dir| {
            let full = to_slash(dir);
            let relative = dir.strip_prefix(cwd).map(to_slash).unwrap_or_default();
            !excludes.iter().any(|glob| {
                if glob.is_absolute() {
                    glob.matches(&full)
                } else {
                    glob.matches(&relative)
                }
            })
        })
        .collect();

    dirs.sort();
    dirs.dedup();
    Ok(dirs)
}

fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn has_magic(segment: &str) -> bool {
    segment.contains(|c| matches!(c, '*' | '?' | '[' | '{'))
}

/// Drops `./` segments and trailing slashes; keeps `..`.
fn clean(pattern: &str) -> String {
    let pattern = pattern.replace('\\', "/");
    let absolute = pattern.starts_with('/');
    let segments: Vec<&str> = pattern
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect();
    let joined = segments.join("/");
    match (absolute, joined.is_empty()) {
        (true, _) => format!("/{}", joined),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

fn match_segments(segments: &[Segment], names: &[&str]) -> bool {
    match segments.split_first() {
        None => names.is_empty(),
        Some((Segment::Globstar, rest)) => {
            for skip in 0..=names.len() {
                if match_segments(rest, &names[skip..]) {
                    return true;
                }
                if skip < names.len() && !Segment::Globstar.matches(names[skip]) {
                    return false;
                }
            }
            false
        }
        Some((segment, rest)) => match names.split_first() {
            Some((name, names)) => segment.matches(name) && match_segments(rest, names),
            None => false,
        },
    }
}

/// Expands `{a,b}` groups, nested ones included, into plain alternatives.
fn expand_braces(pattern: &str) -> std::result::Result<Vec<String>, &'static str> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut depth = 0usize;
    let mut open = None;
    let mut commas = Vec::new();
    let mut in_class = false;

    for (i, c) in chars.iter().enumerate() {
        match *c {
            '[' if !in_class => in_class = true,
            ']' if in_class => in_class = false,
            _ if in_class => {}
            '{' => {
                if depth == 0 {
                    open = Some(i);
                }
                depth += 1;
            }
            ',' if depth == 1 => commas.push(i),
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    let Some(start) = open else { break };
                    let prefix: String = chars[..start].iter().collect();
                    let suffix: String = chars[i + 1..].iter().collect();
                    let mut bounds = vec![start];
                    bounds.extend(&commas);
                    bounds.push(i);

                    let mut expanded = Vec::new();
                    for pair in bounds.windows(2) {
                        let body: String = chars[pair[0] + 1..pair[1]].iter().collect();
                        expanded.extend(expand_braces(&format!("{}{}{}", prefix, body, suffix))?);
                    }
                    return Ok(expanded);
                }
            }
            _ => {}
        }
    }

    if depth > 0 {
        return Err("unclosed brace");
    }
    Ok(vec![pattern.to_string()])
}

fn compile_segment(segment: &str) -> std::result::Result<Segment, String> {
    if segment == "**" {
        return Ok(Segment::Globstar);
    }

    let chars: Vec<char> = segment.chars().collect();
    let mut regex = String::from("^");
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' => {
                while chars.get(i) == Some(&'*') {
                    i += 1;
                }
                regex.push_str("[^/]*");
            }
            '?' => {
                regex.push_str("[^/]");
                i += 1;
            }
            '[' => {
                let close = chars[i + 1..]
                    .iter()
                    .skip(1)
                    .position(|c| *c == ']')
                    .map(|offset| i + 2 + offset)
                    .ok_or_else(|| "unclosed character class".to_string())?;
                let mut class: String = chars[i + 1..close].iter().collect();
                if let Some(rest) = class.strip_prefix('!') {
                    class = format!("^{}", rest);
                }
                regex.push('[');
                regex.push_str(&class.replace('\\', "\\\\").replace('[', "\\["));
                regex.push(']');
                i = close + 1;
            }
            other => {
                regex.push_str(&regex::escape(&other.to_string()));
                i += 1;
            }
        }
    }

    regex.push('$');
    let regex = Regex::new(&regex).map_err(|e| e.to_string())?;
    Ok(Segment::Match {
        regex,
        dotted: segment.starts_with('.'),
    })
}
