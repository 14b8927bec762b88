//! Memory parsing utilities for `/proc/<pid>/smaps`.
//!
//! The parser splits the smaps text into one counter set per mapping, keyed by
//! the mapping's start address, and the aggregator folds those sets into the
//! per-process RSS/PSS/USS totals (all in kB).

use ahash::AHashMap as HashMap;

/// Unit suffix that marks a counter line.
const KB_SUFFIX: &str = "kB";

/// Counters of a single mapping, keyed by lowercased label.
pub type MappingEntry = HashMap<String, u64>;

/// All mappings of one process, keyed by start address.
pub type Mappings = HashMap<String, MappingEntry>;

/// Aggregated memory usage of one process, in kB.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryTotals {
    pub rss: u64,
    pub pss: u64,
    pub uss: u64,
}

/// Parses a counter value, treating anything that is not a plain
/// non-negative integer as zero. A malformed counter never fails the probe.
pub fn parse_or_zero(v: &str) -> u64 {
    v.trim().parse().unwrap_or(0)
}

/// Splits smaps text into per-mapping counter sets.
///
/// A line whose last field is not `kB` opens a new mapping keyed by the text
/// before the first `-` of its first field. Lines such as `VmFlags:` therefore
/// open empty sets of their own; they hold no counters and do not change the
/// totals.
///
/// An empty line ends the scan. Mappings after a blank line are dropped.
pub fn parse_smaps(text: &str) -> Mappings {
    let mut mappings = Mappings::new();
    let mut start = String::new();

    for line in text.split('\n') {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let Some(last) = fields.last() else {
            break;
        };

        if *last != KB_SUFFIX {
            start = fields[0].split('-').next().unwrap_or_default().to_string();
            mappings.insert(start.clone(), MappingEntry::new());
            continue;
        }

        let label = fields[0].trim_end_matches(':').to_lowercase();
        let value = fields.get(1).map(|v| parse_or_zero(v)).unwrap_or(0);
        mappings
            .entry(start.clone())
            .or_default()
            .insert(label, value);
    }

    mappings
}

/// Folds all mappings of a process into RSS/PSS/USS totals.
pub fn aggregate(mappings: &Mappings) -> MemoryTotals {
    mappings
        .values()
        .fold(MemoryTotals::default(), |acc, entry| {
            let counter = |name: &str| entry.get(name).copied().unwrap_or(0);
            MemoryTotals {
                rss: acc.rss.saturating_add(counter("rss")),
                pss: acc.pss.saturating_add(counter("pss")),
                uss: acc
                    .uss
                    .saturating_add(counter("private_clean"))
                    .saturating_add(counter("private_dirty")),
            }
        })
}

/// Parses smaps text and aggregates it in one step.
pub fn memory_totals(text: &str) -> MemoryTotals {
    aggregate(&parse_smaps(text))
}
