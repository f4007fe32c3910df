//! Size totals and human-readable rendering.

/// Sum a listing of `(path, size)` file entries.
///
/// Returns the total in bytes together with its human-readable rendering.
/// Empty input yields zero.
pub fn total_size(entries: &[(String, u64)]) -> (u64, String) {
    let total = entries.iter().map(|(_, size)| size).sum();
    (total, format_size(total))
}

/// GNU-style short rendering with binary magnitudes: `350B`, `1.5KiB`,
/// `2.0MiB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB", "TiB", "PiB"];

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{}{}", bytes, UNITS[0])
    } else {
        format!("{:.1}{}", size, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_size() {
        let entries = vec![("f1".to_string(), 100), ("f2".to_string(), 250)];
        assert_eq!(total_size(&entries), (350, "350B".to_string()));
    }

    #[test]
    fn test_total_size_empty() {
        assert_eq!(total_size(&[]), (0, "0B".to_string()));
    }

    #[test]
    fn test_format_size_units() {
        assert_eq!(format_size(0), "0B");
        assert_eq!(format_size(1023), "1023B");
        assert_eq!(format_size(1024), "1.0KiB");
        assert_eq!(format_size(1536), "1.5KiB");
        assert_eq!(format_size(2 * 1024 * 1024), "2.0MiB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0GiB");
    }
}
