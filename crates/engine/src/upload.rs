//! Upload constraint evaluation.
//!
//! Pure functions of their inputs: no state, no I/O. The evaluation order is
//! fixed so rejection messages are deterministic: the count cap is applied
//! first with a single aggregate reason, then size, then type. Files beyond
//! the cap are dropped from consideration entirely rather than producing one
//! message each; the cap is hard, not a partial acceptance.

use intake_types::{SelectedFile, UploadConstraint};

/// Result of offering new files against a field's constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOutcome {
    /// Existing files followed by the accepted candidates, capped at
    /// `max_files`.
    pub accepted: Vec<SelectedFile>,
    /// Ordered, human-readable rejection reasons.
    pub rejected: Vec<String>,
}

/// Evaluates newly offered files against `constraint`, given the files
/// already held for the field.
pub fn evaluate(existing: &[SelectedFile], offered: &[SelectedFile], constraint: &UploadConstraint) -> UploadOutcome {
    let mut outcome = UploadOutcome {
        accepted: existing.to_vec(),
        rejected: Vec::new(),
    };

    let room = constraint.max_files.saturating_sub(existing.len());
    if offered.len() > room {
        let plural = if room == 1 { "file" } else { "files" };
        outcome.rejected.push(format!("only {} more {} allowed", room, plural));
    }

    for candidate in offered.iter().take(room) {
        if candidate.size_bytes > constraint.max_size_bytes {
            outcome.rejected.push(format!(
                "{} is too large (limit {})",
                candidate.name,
                format_size(constraint.max_size_bytes)
            ));
            continue;
        }

        if !type_accepted(candidate, &constraint.accepted) {
            outcome.rejected.push(format!("{}: invalid file type", candidate.name));
            continue;
        }

        outcome.accepted.push(candidate.clone());
    }

    outcome.accepted.truncate(constraint.max_files);
    outcome
}

/// Removes the file at `index`, preserving the relative order of the rest.
/// Remaining files were already validated and are never re-checked.
pub fn remove(files: &[SelectedFile], index: usize) -> Vec<SelectedFile> {
    files
        .iter()
        .enumerate()
        .filter(|(position, _)| *position != index)
        .map(|(_, file)| file.clone())
        .collect()
}

fn type_accepted(file: &SelectedFile, patterns: &[String]) -> bool {
    if patterns.is_empty() {
        return true;
    }
    patterns.iter().any(|pattern| matches_pattern(file, pattern))
}

/// Matches one accepted-pattern entry: an exact MIME type, a `type/*`
/// wildcard, or an extension glob (`*.jpg` / `.jpg`).
fn matches_pattern(file: &SelectedFile, pattern: &str) -> bool {
    if let Some(prefix) = pattern.strip_suffix("/*") {
        return file
            .media_type
            .as_deref()
            .and_then(|media| media.split('/').next())
            .is_some_and(|top| top.eq_ignore_ascii_case(prefix));
    }

    if pattern.contains('/') {
        return file.media_type.as_deref().is_some_and(|media| media.eq_ignore_ascii_case(pattern));
    }

    let extension = pattern.trim_start_matches('*');
    if !extension.starts_with('.') {
        return false;
    }
    file.name.to_ascii_lowercase().ends_with(&extension.to_ascii_lowercase())
}

/// Formats a byte count in human units for rejection messages.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[unit])
    } else if (value - value.round()).abs() < 0.05 {
        format!("{:.0} {}", value.round(), UNITS[unit])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
