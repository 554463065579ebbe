/// Форматирует число с разделителями тысяч (точками)
///
/// # Примеры
/// ```
/// use backend::shared::format::format_number;
/// assert_eq!(format_number(1234567), "1.234.567");
/// assert_eq!(format_number(42), "42");
/// ```
pub fn format_number(n: usize) -> String {
    group_thousands(&n.to_string())
}

/// Денежная сумма: разделители тысяч и два знака после запятой
///
/// # Примеры
/// ```
/// use backend::shared::format::format_amount;
/// assert_eq!(format_amount(1234567.891), "1.234.567,89");
/// assert_eq!(format_amount(-50.5), "-50,50");
/// ```
pub fn format_amount(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}{},{}", sign, group_thousands(int_part), frac_part)
}

fn group_thousands(digits: &str) -> String {
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push('.');
        }
        result.push(ch);
    }
    result.chars().rev().collect()
}
