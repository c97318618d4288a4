/// Human-readable size for the "Size" column
pub fn beautify_file_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;
    const TB: u64 = 1024 * GB;

    if bytes < KB {
        format!("{} B", bytes)
    } else if bytes < MB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else if bytes < GB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes < TB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_sizes_stay_in_bytes() {
        assert_eq!(beautify_file_size(0), "0 B");
        assert_eq!(beautify_file_size(1023), "1023 B");
    }

    #[test]
    fn test_units_scale() {
        assert_eq!(beautify_file_size(1536), "1.50 KB");
        assert_eq!(beautify_file_size(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(beautify_file_size(3 * 1024 * 1024 * 1024), "3.00 GB");
    }
}
