//! Tar-gzip extraction with wrapper-directory stripping.
//!
//! Extraction runs in two passes. The first pass only reads entry names and
//! turns them into an [`ExtractionPlan`]; the second pass streams the archive
//! again and unpacks each planned entry to its destination. When every nested
//! entry shares one top-level directory, that directory is stripped so the
//! archive contents land directly in the target.

use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Component, Path, PathBuf};

use odoogen_common::error::{OdoogenError, Result};
use odoogen_common::report::{Level, Reporter, Unit};

/// One archive entry and where it goes, relative to the target directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedEntry {
    /// Position of the entry in the archive stream.
    pub index: usize,
    /// Entry name as stored in the archive.
    pub source: String,
    /// Destination relative to the target directory.
    pub destination: PathBuf,
}

/// Result of planning an extraction from the archive's entry names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionPlan {
    /// Wrapper directory being stripped, if the archive has exactly one root.
    pub root: Option<String>,
    /// Entries to unpack, in archive order.
    pub entries: Vec<PlannedEntry>,
    /// Entries refused because they would escape the target directory.
    pub rejected: Vec<String>,
}

/// Outcome of a successful extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionSummary {
    /// Number of entries in the archive.
    pub total_entries: usize,
    /// Number of entries written to the target.
    pub extracted: usize,
    /// Wrapper directory that was stripped.
    pub stripped_root: Option<String>,
}

/// Builds the extraction plan for the given entry names.
///
/// Names are compared with a leading `./` removed. The root is the single
/// distinct first segment among names containing a `/`; with zero or several
/// such segments entries keep their names. With a root, only entries under it
/// are planned.
#[must_use]
pub fn plan_extraction(names: &[String]) -> ExtractionPlan {
    let cleaned: Vec<&str> = names.iter().map(|n| clean_name(n)).collect();

    let roots: BTreeSet<&str> = cleaned
        .iter()
        .filter(|name| name.contains('/'))
        .filter_map(|name| name.split('/').next())
        .collect();
    let root = if roots.len() == 1 {
        roots.into_iter().next().map(str::to_string)
    } else {
        None
    };

    let mut plan = ExtractionPlan {
        root: root.clone(),
        ..ExtractionPlan::default()
    };

    for (index, name) in cleaned.iter().enumerate() {
        let relative = match &root {
            Some(root) => {
                let Some(relative) = strip_root(name, root) else {
                    tracing::debug!(entry = %names[index], %root, "entry outside the archive root skipped");
                    continue;
                };
                relative
            }
            None => name.trim_end_matches('/'),
        };
        if relative.is_empty() {
            continue;
        }
        let destination = PathBuf::from(relative);
        if !is_contained(&destination) {
            plan.rejected.push(names[index].clone());
            continue;
        }
        plan.entries.push(PlannedEntry {
            index,
            source: names[index].clone(),
            destination,
        });
    }

    plan
}

fn clean_name(name: &str) -> &str {
    let mut name = name;
    while let Some(rest) = name.strip_prefix("./") {
        name = rest;
    }
    name
}

/// Name relative to `root`, `None` for entries outside it.
fn strip_root<'a>(name: &'a str, root: &str) -> Option<&'a str> {
    let trimmed = name.trim_end_matches('/');
    if trimmed == root {
        return Some("");
    }
    trimmed
        .strip_prefix(root)
        .and_then(|rest| rest.strip_prefix('/'))
}

fn is_contained(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Lists entry names of a tar-gzip archive without unpacking anything.
///
/// # Errors
///
/// Returns an extraction error if the archive cannot be opened or decoded.
pub fn list_entries(archive_path: &Path) -> Result<Vec<String>> {
    let mut archive = open_archive(archive_path)?;
    let entries = archive
        .entries()
        .map_err(|e| extraction_error(archive_path, &e))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| extraction_error(archive_path, &e))?;
        names.push(String::from_utf8_lossy(&entry.path_bytes()).into_owned());
    }
    Ok(names)
}

/// Extracts a tar-gzip archive into `target`.
///
/// Partially written files are left in place when extraction fails midway.
///
/// # Errors
///
/// Returns an extraction error if the archive is corrupt or a file cannot be
/// written.
pub fn extract(
    archive_path: &Path,
    target: &Path,
    reporter: &dyn Reporter,
) -> Result<ExtractionSummary> {
    tracing::info!(
        archive = %archive_path.display(),
        target = %target.display(),
        "extracting archive"
    );
    reporter.section("Extracting archive");

    std::fs::create_dir_all(target).map_err(|e| OdoogenError::io(target, e))?;

    let names = list_entries(archive_path)?;
    let plan = plan_extraction(&names);
    reporter.info(&format!("Archive contains {} entries", names.len()));
    for rejected in &plan.rejected {
        reporter.warning(&format!("Skipping unsafe archive entry {rejected}"));
    }

    match &plan.root {
        Some(root) => reporter.message(
            Level::Extract,
            &format!(
                "Extracting the contents of {root}/ directly into {}",
                target.display()
            ),
        ),
        None => reporter.message(
            Level::Extract,
            &format!("Extracting directly into {}", target.display()),
        ),
    }

    let extracted = apply_plan(archive_path, target, &plan, reporter)?;

    if let Some(root) = &plan.root {
        let wrapper = target.join(root);
        if wrapper.is_dir() {
            if let Err(e) = std::fs::remove_dir(&wrapper) {
                tracing::debug!(path = %wrapper.display(), error = %e, "wrapper directory left in place");
            }
        }
    }

    reporter.success(&format!("Extraction complete in {}", target.display()));
    Ok(ExtractionSummary {
        total_entries: names.len(),
        extracted,
        stripped_root: plan.root,
    })
}

fn apply_plan(
    archive_path: &Path,
    target: &Path,
    plan: &ExtractionPlan,
    reporter: &dyn Reporter,
) -> Result<usize> {
    let mut archive = open_archive(archive_path)?;
    let entries = archive
        .entries()
        .map_err(|e| extraction_error(archive_path, &e))?;

    let root = std::fs::canonicalize(target).map_err(|e| OdoogenError::io(target, e))?;
    let progress = reporter.progress("Extracting files", Some(plan.entries.len() as u64), Unit::Items);
    let mut pending = plan.entries.iter().peekable();
    let mut extracted = 0;

    for (index, entry) in entries.enumerate() {
        let Some(planned) = pending.next_if(|p| p.index == index) else {
            if pending.peek().is_none() {
                break;
            }
            continue;
        };
        let mut entry = entry.map_err(|e| extraction_error(archive_path, &e))?;
        progress.advance(1);
        if let Some(reason) = unsafe_link(&entry) {
            reporter.warning(&format!("Skipping unsafe archive entry {} ({reason})", planned.source));
            continue;
        }
        let destination = target.join(&planned.destination);
        if let Some(parent) = destination.parent() {
            if !resolves_inside(parent, &root) {
                reporter.warning(&format!(
                    "Skipping archive entry {} outside {}",
                    planned.source,
                    target.display()
                ));
                continue;
            }
            std::fs::create_dir_all(parent).map_err(|e| OdoogenError::io(parent, e))?;
        }
        let _ = entry.unpack(&destination).map_err(|e| OdoogenError::Extraction {
            archive: archive_path.to_path_buf(),
            message: format!("cannot write {}: {e}", destination.display()),
        })?;
        extracted += 1;
    }

    progress.finish();
    Ok(extracted)
}

/// Why a link entry may not be unpacked, if it may not.
///
/// Hard links are refused. Symlinks must be relative and never climb.
fn unsafe_link<R: std::io::Read>(entry: &tar::Entry<'_, R>) -> Option<&'static str> {
    match entry.header().entry_type() {
        tar::EntryType::Link => Some("hard link"),
        tar::EntryType::Symlink => match entry.link_name() {
            Ok(Some(link)) if !link.as_os_str().is_empty() && is_contained(&link) => None,
            Ok(Some(_)) => Some("symlink leaving the target"),
            Ok(None) | Err(_) => Some("symlink without target"),
        },
        _ => None,
    }
}

/// Whether `dir` stays under `root` once its closest existing ancestor is
/// resolved through symlinks.
fn resolves_inside(dir: &Path, root: &Path) -> bool {
    dir.ancestors()
        .find(|ancestor| ancestor.symlink_metadata().is_ok())
        .and_then(|existing| std::fs::canonicalize(existing).ok())
        .is_some_and(|resolved| resolved.starts_with(root))
}

fn open_archive(archive_path: &Path) -> Result<tar::Archive<flate2::read::GzDecoder<File>>> {
    let file = File::open(archive_path).map_err(|e| OdoogenError::io(archive_path, e))?;
    Ok(tar::Archive::new(flate2::read::GzDecoder::new(file)))
}

fn extraction_error(archive_path: &Path, error: &std::io::Error) -> OdoogenError {
    OdoogenError::Extraction {
        archive: archive_path.to_path_buf(),
        message: error.to_string(),
    }
}
