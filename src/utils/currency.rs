/// Currency helpers for Indonesian Rupiah.
///
/// IDR has no minor unit in practice, so every amount is a whole number of
/// rupiah stored as `BIGINT`.

/// Format rupiah with dot thousands separators: `Rp 1.500.000`.
pub fn format_idr(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    if amount < 0 {
        format!("-Rp {}", grouped)
    } else {
        format!("Rp {}", grouped)
    }
}

/// Parse a user-supplied rupiah amount, accepting `1500000`, `1.500.000`
/// or `Rp 1.500.000`.
pub fn parse_idr(input: &str) -> Result<i64, String> {
    let cleaned: String = input
        .trim()
        .trim_start_matches("Rp")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .collect();

    if cleaned.is_empty() {
        return Err("Invalid amount format".to_string());
    }

    let amount = cleaned
        .parse::<i64>()
        .map_err(|_| "Invalid amount format".to_string())?;

    if amount < 0 {
        return Err("Amount cannot be negative".to_string());
    }

    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_idr() {
        assert_eq!(format_idr(0), "Rp 0");
        assert_eq!(format_idr(950), "Rp 950");
        assert_eq!(format_idr(50_000), "Rp 50.000");
        assert_eq!(format_idr(1_500_000), "Rp 1.500.000");
        assert_eq!(format_idr(100_000_000), "Rp 100.000.000");
        assert_eq!(format_idr(-25_000), "-Rp 25.000");
    }

    #[test]
    fn test_parse_idr() {
        assert_eq!(parse_idr("1500000"), Ok(1_500_000));
        assert_eq!(parse_idr("1.500.000"), Ok(1_500_000));
        assert_eq!(parse_idr("Rp 50.000"), Ok(50_000));
        assert_eq!(parse_idr("-100"), Err("Amount cannot be negative".to_string()));
        assert_eq!(parse_idr("abc"), Err("Invalid amount format".to_string()));
        assert_eq!(parse_idr("  "), Err("Invalid amount format".to_string()));
    }
}
