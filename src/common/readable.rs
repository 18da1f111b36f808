/// Renders a number of seconds as e.g. "1 day, 2 hours and 5 seconds".
///
/// Zero components are dropped and only values above one get a plural `s`.
pub fn readable(seconds: u64) -> String {
    let (minutes, seconds) = (seconds / 60, seconds % 60);
    let (hours, minutes) = (minutes / 60, minutes % 60);
    let (days, hours) = (hours / 24, hours % 24);

    let segments: Vec<String> = [
        ("day", days),
        ("hour", hours),
        ("minute", minutes),
        ("second", seconds),
    ]
    .into_iter()
    .filter(|&(_, value)| value > 0)
    .map(|(name, value)| {
        let plural = if value > 1 { "s" } else { "" };
        format!("{} {}{}", group_thousands(value), name, plural)
    })
    .collect();

    match segments.split_last() {
        None => "0 seconds".to_string(),
        Some((last, [])) => last.clone(),
        Some((last, rest)) => format!("{} and {}", rest.join(", "), last),
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_literal() {
        assert_eq!(readable(0), "0 seconds");
    }

    #[test]
    fn singular_components() {
        assert_eq!(readable(1), "1 second");
        assert_eq!(readable(61), "1 minute and 1 second");
        assert_eq!(readable(3661), "1 hour, 1 minute and 1 second");
        assert_eq!(readable(90061), "1 day, 1 hour, 1 minute and 1 second");
    }

    #[test]
    fn zero_components_are_skipped() {
        assert_eq!(readable(86400 + 2 * 3600 + 5), "1 day, 2 hours and 5 seconds");
        assert_eq!(readable(7200), "2 hours");
        assert_eq!(readable(120 + 59), "2 minutes and 59 seconds");
    }

    #[test]
    fn large_values_are_grouped() {
        assert_eq!(readable(1000 * 86400), "1,000 days");
        assert_eq!(group_thousands(1234567), "1,234,567");
        assert_eq!(group_thousands(999), "999");
    }
}
