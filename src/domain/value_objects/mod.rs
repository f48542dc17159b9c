//! Value objects and the lenient normalizers the courier and messaging
//! payloads are built from.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Weight used when the configured kilogram value cannot be read.
pub const FALLBACK_WEIGHT_GRAMS: u32 = 500;

/// Truncate to at most `max` characters, never splitting a code point.
pub fn truncate(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((idx, _)) => value[..idx].to_string(),
        None => value.to_string(),
    }
}

pub fn only_digits(value: &str) -> String { value.chars().filter(char::is_ascii_digit).collect() }

/// Round half up, the way the storefront computes totals.
pub fn round_half_up(value: f64) -> i64 { (value + 0.5).floor() as i64 }

/// Kilograms to grams, at least 1g; unreadable input falls back to 500g.
pub fn kg_to_grams(raw: &str) -> u32 {
    match raw.trim().parse::<f64>() {
        Ok(kg) if kg.is_finite() => round_half_up(kg * 1000.0).clamp(1, u32::MAX as i64) as u32,
        _ => FALLBACK_WEIGHT_GRAMS,
    }
}

/// Phone number reduced to its last 10 digits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phone10(String);

impl Phone10 {
    /// Shorter digit strings are kept as they are, no padding.
    pub fn normalize(raw: &str) -> Self {
        let digits = only_digits(raw);
        let n = digits.len();
        if n >= 10 { Self(digits[n - 10..].to_string()) } else { Self(digits) }
    }
    pub fn as_str(&self) -> &str { &self.0 }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl fmt::Display for Phone10 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Postal code reduced to its first 6 digits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pincode(String);

impl Pincode {
    pub fn normalize(raw: &str) -> Self {
        let mut digits = only_digits(raw);
        digits.truncate(6);
        Self(digits)
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Pincode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Address split into courier lines.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AddressLines { pub primary: String, pub secondary: String }

pub const ADDRESS_LINE_MAX: usize = 200;

impl AddressLines {
    /// First two comma-separated segments go to the primary line, the rest
    /// to the secondary line.
    pub fn split(raw: &str) -> Self {
        let s = raw.trim();
        if s.is_empty() { return Self::default(); }
        let parts: Vec<&str> = s.split(',').map(str::trim_start).collect();
        let head = parts.iter().take(2).copied().collect::<Vec<_>>().join(", ");
        let primary = if head.is_empty() { truncate(s, ADDRESS_LINE_MAX) } else { truncate(&head, ADDRESS_LINE_MAX) };
        let secondary = truncate(&parts.iter().skip(2).copied().collect::<Vec<_>>().join(", "), ADDRESS_LINE_MAX);
        Self { primary, secondary }
    }
}

/// Recipient address in the messaging provider's `whatsapp:+<cc><number>` form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhatsAppAddress(String);

pub const DEFAULT_COUNTRY_CODE: &str = "91";

impl WhatsAppAddress {
    /// `None` when the input carries no digits at all.
    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim();
        if s.is_empty() { return None; }
        if s.starts_with("whatsapp:") { return Some(Self(s.to_string())); }
        if s.starts_with('+') { return Some(Self(format!("whatsapp:{s}"))); }
        let digits = only_digits(s);
        match digits.len() {
            0 => None,
            10 => Some(Self(format!("whatsapp:+{DEFAULT_COUNTRY_CODE}{digits}"))),
            _ => Some(Self(format!("whatsapp:+{digits}"))),
        }
    }

    /// Sender numbers keep `+` and digits only.
    pub fn sender(raw: &str) -> Option<Self> {
        let s = raw.trim();
        if s.is_empty() { return None; }
        if s.starts_with("whatsapp:") { return Some(Self(s.to_string())); }
        if s.starts_with('+') { return Some(Self(format!("whatsapp:{s}"))); }
        let kept: String = s.chars().filter(|c| c.is_ascii_digit() || *c == '+').collect();
        Some(Self(format!("whatsapp:+{kept}")))
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for WhatsAppAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Read a JSON number or numeric string; anything else reads as absent.
pub fn lenient_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.trim().is_empty() => Some(0.0),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null => Some(0.0),
        _ => None,
    };
    n.filter(|v| v.is_finite())
}

/// Serde adapter for [`lenient_number`] on optional fields. A missing key
/// stays absent while an explicit `null` reads as zero.
pub fn deserialize_lenient<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(lenient_number(&Value::deserialize(d)?))
}

/// Serde adapter accepting strings or numbers as text; numbers are stringified.
pub fn deserialize_text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    })
}

/// Serde adapter for nested records: a value of the wrong shape reads as default.
pub fn deserialize_or_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Option::<Value>::deserialize(d)?.unwrap_or(Value::Null);
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Serde adapter for lists of records: each element of the wrong shape reads
/// as default, a non-list reads as empty.
pub fn deserialize_each_or_default<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(match Value::deserialize(d)? {
        Value::Array(items) => items.into_iter().map(|v| serde_json::from_value(v).unwrap_or_default()).collect(),
        _ => Vec::new(),
    })
}

/// Number rendered the way a JSON number prints, `499` rather than `499.0`.
pub fn number_text(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 { format!("{}", value as i64) } else { value.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kg_to_grams() {
        assert_eq!(kg_to_grams("0.7"), 700);
        assert_eq!(kg_to_grams("abc"), 500);
        assert_eq!(kg_to_grams(""), 500);
        assert_eq!(kg_to_grams("0"), 1);
        assert_eq!(kg_to_grams("-2"), 1);
        assert_eq!(kg_to_grams(" 1.25 "), 1250);
    }

    #[test]
    fn test_phone10() {
        assert_eq!(Phone10::normalize("9876543210").as_str(), "9876543210");
        assert_eq!(Phone10::normalize("+91 98765-43210").as_str(), "9876543210");
        assert_eq!(Phone10::normalize("12345").as_str(), "12345");
        assert!(Phone10::normalize("n/a").is_empty());
    }

    #[test]
    fn test_pincode() {
        assert_eq!(Pincode::normalize("110087-extra").as_str(), "110087");
        assert_eq!(Pincode::normalize("1100").as_str(), "1100");
    }

    #[test]
    fn test_address_split() {
        let lines = AddressLines::split("A-51, First floor,  Meera Bagh, Paschim Vihar");
        assert_eq!(lines.primary, "A-51, First floor");
        assert_eq!(lines.secondary, "Meera Bagh, Paschim Vihar");
        assert_eq!(AddressLines::split("   "), AddressLines::default());
        let single = AddressLines::split("House 12");
        assert_eq!(single.primary, "House 12");
        assert_eq!(single.secondary, "");
        let long = "x".repeat(250);
        assert_eq!(AddressLines::split(&long).primary.chars().count(), 200);
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("₹₹₹₹", 2), "₹₹");
        assert_eq!(truncate("abc", 10), "abc");
    }

    #[test]
    fn test_whatsapp_address() {
        assert_eq!(WhatsAppAddress::parse("98765 43210").unwrap().as_str(), "whatsapp:+919876543210");
        assert_eq!(WhatsAppAddress::parse("+14155550100").unwrap().as_str(), "whatsapp:+14155550100");
        assert_eq!(WhatsAppAddress::parse("whatsapp:+1").unwrap().as_str(), "whatsapp:+1");
        assert_eq!(WhatsAppAddress::parse("447700900123").unwrap().as_str(), "whatsapp:+447700900123");
        assert!(WhatsAppAddress::parse("none").is_none());
        assert_eq!(WhatsAppAddress::sender("1 415 555").unwrap().as_str(), "whatsapp:+1415555");
    }

    #[test]
    fn test_lenient_number() {
        assert_eq!(lenient_number(&json!(12.5)), Some(12.5));
        assert_eq!(lenient_number(&json!("1200")), Some(1200.0));
        assert_eq!(lenient_number(&json!("12x")), None);
        assert_eq!(lenient_number(&json!({"a": 1})), None);
        assert_eq!(number_text(499.0), "499");
        assert_eq!(number_text(499.5), "499.5");
    }
}
