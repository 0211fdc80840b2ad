//! Human-readable formatting for sizes, throughput and durations

const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;
const TB: u64 = GB * 1024;

/// Format a byte count using binary units with one decimal place
pub fn format_size(bytes: u64) -> String {
    if bytes >= TB {
        format!("{:.1} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format a throughput in bytes per second
pub fn format_speed(bytes_per_second: u64) -> String {
    format!("{}/s", format_size(bytes_per_second))
}

/// Format a remaining-time estimate: `42s` or `3m 7s`
pub fn format_eta(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{}s", seconds);
    }
    format!("{}m {}s", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size_units() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * MB), "5.0 MB");
        assert_eq!(format_size(7 * GB + GB / 2), "7.5 GB");
        assert_eq!(format_size(2 * TB), "2.0 TB");
    }

    #[test]
    fn test_format_speed() {
        assert_eq!(format_speed(20 * MB), "20.0 MB/s");
    }

    #[test]
    fn test_format_eta() {
        assert_eq!(format_eta(0), "0s");
        assert_eq!(format_eta(59), "59s");
        assert_eq!(format_eta(60), "1m 0s");
        assert_eq!(format_eta(187), "3m 7s");
    }
}
