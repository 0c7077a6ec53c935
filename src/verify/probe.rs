use std::path::Path;

/// Result of probing the historical layout variants of one logical artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    /// First variant that satisfied the inspection.
    Complete(String),
    /// No variant was complete; problems of the first variant that had content.
    Incomplete { variant: String, problems: Vec<String> },
    /// No variant exists or has anything to inspect.
    Absent,
}

/// Tries `variants` (directories under `outputs_dir`) in order. `inspect`
/// returns `None` when a variant has nothing to inspect, otherwise the list of
/// problems found in it; an empty list is a complete variant.
pub fn probe_variants<F>(outputs_dir: &Path, variants: &[String], mut inspect: F) -> Probe
where
    F: FnMut(&str, &Path) -> Option<Vec<String>>,
{
    let mut first_incomplete: Option<(String, Vec<String>)> = None;
    for variant in variants {
        let dir = outputs_dir.join(variant);
        if !dir.is_dir() {
            continue;
        }
        let Some(problems) = inspect(variant, &dir) else {
            continue;
        };
        if problems.is_empty() {
            return Probe::Complete(variant.clone());
        }
        if first_incomplete.is_none() {
            first_incomplete = Some((variant.clone(), problems));
        }
    }
    match first_incomplete {
        Some((variant, problems)) => Probe::Incomplete { variant, problems },
        None => Probe::Absent,
    }
}
