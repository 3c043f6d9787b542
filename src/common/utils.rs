//! Utility functions for geocdn

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::time::{SystemTime, UNIX_EPOCH};

/// Percent-encoding set for object names placed in URL paths
const NAME_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b'/')
    .add(b'%')
    .add(b' ')
    .add(b'?')
    .add(b'#')
    .add(b'&')
    .add(b'"')
    .add(b'<')
    .add(b'>');

/// Longest accepted object name, in bytes
pub const MAX_NAME_LEN: usize = 255;

/// Encode an object name for URL usage
pub fn encode_name(name: &str) -> String {
    utf8_percent_encode(name, NAME_ENCODE_SET).to_string()
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_idx])
}

/// Get current Unix timestamp (seconds)
pub fn timestamp_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Validate an object name.
///
/// Names become a path segment on every storage node, so separators and
/// relative components are refused.
pub fn validate_name(name: &str) -> crate::Result<()> {
    if name.is_empty() {
        return Err(crate::Error::InvalidInput("filename cannot be empty".into()));
    }

    if name.len() > MAX_NAME_LEN {
        return Err(crate::Error::InvalidInput(format!(
            "filename too long (max {} bytes)",
            MAX_NAME_LEN
        )));
    }

    if name == "." || name == ".." {
        return Err(crate::Error::InvalidInput(format!(
            "invalid filename: {}",
            name
        )));
    }

    if name.chars().any(|c| c.is_control() || c == '/' || c == '\\') {
        return Err(crate::Error::InvalidInput(
            "filename contains invalid characters".into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_name() {
        assert_eq!(encode_name("holiday photo #1.jpg"), "holiday%20photo%20%231.jpg");
        assert_eq!(encode_name("50%?.txt"), "50%25%3F.txt");
    }

    #[test]
    fn test_plain_names_are_untouched() {
        assert_eq!(encode_name("report-2024.pdf"), "report-2024.pdf");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0.00 B");
        assert_eq!(format_bytes(1023), "1023.00 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1024 * 1024), "1.00 MB");
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("report.pdf").is_ok());
        assert!(validate_name("with space.txt").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name(".").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name("dir/file").is_err());
        assert!(validate_name("dir\\file").is_err());
        assert!(validate_name("bad\nname").is_err());
        assert!(validate_name(&"x".repeat(MAX_NAME_LEN + 1)).is_err());
    }
}
