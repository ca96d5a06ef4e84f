//! Resident memory of the current process.

use std::fs;

const PAGE_SIZE: f64 = 4096.;

/// Resident set size in megabytes, from `/proc/self/statm`.
///
/// Best effort: returns `0.0` where the file is missing or unreadable.
pub fn memory_usage() -> f64 {
    fs::read_to_string("/proc/self/statm")
        .ok()
        .and_then(|statm| resident_pages(&statm))
        .map_or(0., |pages| pages as f64 * PAGE_SIZE / 1e6)
}

fn resident_pages(statm: &str) -> Option<u64> {
    statm.split_whitespace().nth(1)?.parse().ok()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn statm_fields() {
        assert_eq!(resident_pages("2048 512 300 10 0 900 0\n"), Some(512));
        assert_eq!(resident_pages("2048"), None);
        assert_eq!(resident_pages(""), None);
    }

    #[test]
    fn non_negative() {
        assert!(memory_usage() >= 0.);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn linux_reports_resident_memory() {
        assert!(memory_usage() > 0.);
    }
}
