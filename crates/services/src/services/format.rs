const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Human-readable byte size: base 1024, at most two decimals, trailing zeros
/// dropped. Values past the TB range stay in TB.
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut exponent = 0;
    let mut scaled = bytes;
    while scaled >= 1024 && exponent < UNITS.len() - 1 {
        scaled /= 1024;
        exponent += 1;
    }

    let value = bytes as f64 / 1024f64.powi(exponent as i32);
    format!("{} {}", trim_decimals(value), UNITS[exponent])
}

fn trim_decimals(value: f64) -> String {
    let fixed = format!("{value:.2}");
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_reference_values() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(5), "5 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1024), "1 KB");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(1_048_576), "1 MB");
        assert_eq!(format_size(1_234_567), "1.18 MB");
    }

    #[test]
    fn clamps_at_terabytes() {
        let five_pb = 5 * 1024u64.pow(5);
        assert_eq!(format_size(five_pb), "5120 TB");
    }
}
