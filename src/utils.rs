//! Formatting helpers for log and summary lines.

/// Format a count with K/M suffix for compact display.
///
/// # Examples
/// ```
/// use netfeeds::utils::format_count;
/// assert_eq!(format_count(500), "500");
/// assert_eq!(format_count(1500), "1.5K");
/// assert_eq!(format_count(1_500_000), "1.5M");
/// ```
pub fn format_count(count: usize) -> String {
    if count >= 1_000_000 {
        format!("{:.1}M", count as f64 / 1_000_000.0)
    } else if count >= 1_000 {
        format!("{:.1}K", count as f64 / 1_000.0)
    } else {
        count.to_string()
    }
}

/// Format an address count with thousands separators.
///
/// # Examples
/// ```
/// use netfeeds::utils::format_addresses;
/// assert_eq!(format_addresses(1000), "1,000");
/// assert_eq!(format_addresses(4_294_967_296), "4,294,967,296");
/// ```
pub fn format_addresses(n: u128) -> String {
    let digits = n.to_string();
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}
