// Duration literal parsing for recipe time fields
//
// Backends store cook times in a handful of shapes: plain integer minutes,
// "45 minutes", "1 hour", or ISO-8601 style tokens like "PT30M" / "PT2H".
// Everything normalizes to integer minutes.

/// Parse a duration literal to whole minutes, or `None` when unparsable
pub fn parse_minutes(literal: &str) -> Option<u32> {
    let s = literal.trim();
    if s.is_empty() {
        return None;
    }

    // Plain integer
    if let Ok(n) = s.parse::<u32>() {
        return Some(n);
    }

    let lower = s.to_lowercase();

    // ISO-8601 style: PT30M, PT2H
    if let Some(rest) = lower.strip_prefix("pt") {
        if let Some(num) = rest.strip_suffix('m') {
            return num.parse().ok();
        }
        if let Some(num) = rest.strip_suffix('h') {
            return num.parse::<u32>().ok().map(|h| h * 60);
        }
        return None;
    }

    // "N minutes" / "N hours" with optional plural
    let mut parts = lower.split_whitespace();
    let number: u32 = parts.next()?.parse().ok()?;
    match parts.next()? {
        "minute" | "minutes" | "min" | "mins" => Some(number),
        "hour" | "hours" | "hr" | "hrs" => Some(number * 60),
        _ => None,
    }
}
