/// Parses compact display counts: `1.2K` -> 1200, `3M` -> 3000000, `1,234` -> 1234.
/// Anything unparseable is 0.
pub fn parse_count_string(raw: &str) -> u64 {
    let cleaned = raw.trim().replace(',', "").to_uppercase();
    let Some(last) = cleaned.chars().last() else {
        return 0;
    };
    let (num_str, mult) = match last {
        'K' => (&cleaned[..cleaned.len() - 1], 1_000.0),
        'M' => (&cleaned[..cleaned.len() - 1], 1_000_000.0),
        'B' => (&cleaned[..cleaned.len() - 1], 1_000_000_000.0),
        _ => (cleaned.as_str(), 1.0),
    };
    match num_str.trim().parse::<f64>() {
        Ok(num) if num.is_finite() && num >= 0.0 => (num * mult).round() as u64,
        _ => 0,
    }
}
