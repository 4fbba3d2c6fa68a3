//! Formatting helpers for money, phone numbers and postal addresses

use crate::template::Value;

/// How a locale writes an amount of money
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrencyStyle {
    pub symbol: &'static str,
    pub group: &'static str,
    pub decimal: &'static str,
    pub symbol_after: bool,
}

impl CurrencyStyle {
    /// Style for a BCP 47 locale tag; unknown locales fall back to en-US
    pub fn for_locale(locale: &str) -> Self {
        match locale.to_ascii_lowercase().replace('_', "-").as_str() {
            "en-gb" => Self {
                symbol: "£",
                group: ",",
                decimal: ".",
                symbol_after: false,
            },
            "de-de" | "de-at" | "es-es" | "it-it" | "nl-nl" => Self {
                symbol: "€",
                group: ".",
                decimal: ",",
                symbol_after: true,
            },
            "fr-fr" | "fr-be" => Self {
                symbol: "€",
                group: "\u{a0}",
                decimal: ",",
                symbol_after: true,
            },
            _ => Self {
                symbol: "$",
                group: ",",
                decimal: ".",
                symbol_after: false,
            },
        }
    }
}

/// Format a number as money; missing or non-numeric input is zero
pub fn format_currency(value: &Value, style: &CurrencyStyle) -> String {
    let amount = value.to_number().unwrap_or(0.0);
    let fixed = format!("{:.2}", amount.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::new();
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push_str(style.group);
        }
        grouped.push(digit);
    }

    let number = format!("{}{}{}", grouped, style.decimal, frac_part);
    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    if style.symbol_after {
        format!("{}{}\u{a0}{}", sign, number, style.symbol)
    } else {
        format!("{}{}{}", sign, style.symbol, number)
    }
}

/// Reformat 10-digit and 1+10-digit US numbers; anything else is returned as given
pub fn format_phone(value: &Value) -> String {
    let raw = value.to_output_string();
    let plausible = raw
        .chars()
        .all(|c| c.is_ascii_digit() || " ()-.+".contains(c));
    if !plausible {
        return raw;
    }

    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    match digits.len() {
        10 => format!("({}) {}-{}", &digits[0..3], &digits[3..6], &digits[6..]),
        11 if digits.starts_with('1') => {
            format!("+1 ({}) {}-{}", &digits[1..4], &digits[4..7], &digits[7..])
        }
        _ => raw,
    }
}

/// Join non-empty address parts with `<br>`
///
/// A single object argument is read as `{street, street2, city, state, zip}`
/// (common aliases accepted) and laid out as street lines then
/// `City, ST 12345`.
pub fn format_address(args: &[Value]) -> String {
    if let [Value::Object(_)] = args {
        return format_address_object(&args[0]);
    }

    args.iter()
        .map(|v| v.to_output_string().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("<br>")
}

fn first_field(value: &Value, names: &[&str]) -> String {
    names
        .iter()
        .filter_map(|name| value.get_property(name))
        .map(|v| v.to_output_string().trim().to_string())
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

fn format_address_object(value: &Value) -> String {
    let street = first_field(value, &["street", "address1", "line1", "address"]);
    let street2 = first_field(value, &["street2", "address2", "line2", "unit"]);
    let city = first_field(value, &["city"]);
    let state = first_field(value, &["state", "region"]);
    let zip = first_field(value, &["zip", "postal_code", "postalCode", "zipCode"]);

    let state_zip = [state, zip]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    let locality = [city, state_zip]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

    [street, street2, locality]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("<br>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_currency_us() {
        let us = CurrencyStyle::for_locale("en-US");
        assert_eq!(format_currency(&Value::Number(1234.5), &us), "$1,234.50");
        assert_eq!(format_currency(&Value::Undefined, &us), "$0.00");
        assert_eq!(format_currency(&Value::from("abc"), &us), "$0.00");
        assert_eq!(format_currency(&Value::from("75"), &us), "$75.00");
        assert_eq!(format_currency(&Value::Number(-1234567.891), &us), "-$1,234,567.89");
    }

    #[test]
    fn test_format_currency_locales() {
        let de = CurrencyStyle::for_locale("de-DE");
        assert_eq!(format_currency(&Value::Number(1234.5), &de), "1.234,50\u{a0}€");
        let gb = CurrencyStyle::for_locale("en_GB");
        assert_eq!(format_currency(&Value::Number(12.0), &gb), "£12.00");
        assert_eq!(CurrencyStyle::for_locale("xx-YY"), CurrencyStyle::for_locale("en-US"));
    }

    #[test]
    fn test_format_phone() {
        assert_eq!(format_phone(&Value::from("5551234567")), "(555) 123-4567");
        assert_eq!(format_phone(&Value::from("555.123.4567")), "(555) 123-4567");
        assert_eq!(format_phone(&Value::from("15551234567")), "+1 (555) 123-4567");
        assert_eq!(format_phone(&Value::Number(5551234567.0)), "(555) 123-4567");
        assert_eq!(format_phone(&Value::from("abc")), "abc");
        assert_eq!(format_phone(&Value::from("25551234567")), "25551234567");
        assert_eq!(format_phone(&Value::Undefined), "");
    }

    #[test]
    fn test_format_address_parts() {
        let parts = [
            Value::from("12 Main St"),
            Value::from(""),
            Value::Undefined,
            Value::from("Springfield, IL 62701"),
        ];
        assert_eq!(format_address(&parts), "12 Main St<br>Springfield, IL 62701");
        assert_eq!(format_address(&[]), "");
    }

    #[test]
    fn test_format_address_object() {
        let addr = Value::from_json(&json!({
            "street": "12 Main St",
            "address2": "Apt 4",
            "city": "Springfield",
            "state": "IL",
            "zip": "62701"
        }));
        assert_eq!(
            format_address(&[addr]),
            "12 Main St<br>Apt 4<br>Springfield, IL 62701"
        );
    }
}
