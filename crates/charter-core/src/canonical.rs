//! Canonical JSON encoding for deterministic hashing and signing.
//!
//! The canonical form is:
//! - Object keys sorted by code point
//! - No whitespace: `,` between items, `:` between key and value
//! - Every character outside printable ASCII escaped as `\uXXXX`
//!   (UTF-16 surrogate pairs above the BMP, lowercase hex)
//! - Floats in shortest round-trip form, exponent outside `1e-4 ..< 1e16`
//!
//! Existing chain files were written in exactly this form. Entry hashes and
//! signatures are computed over these bytes, so the encoding is FROZEN.

use serde_json::{Map, Number, Value};

/// Encode a value to its canonical string.
pub fn canonical_json(value: &Value) -> String {
    let mut buf = String::new();
    encode_value_to(&mut buf, value);
    buf
}

/// Encode a value to its canonical bytes.
pub fn canonical_bytes(value: &Value) -> Vec<u8> {
    canonical_json(value).into_bytes()
}

/// Canonical bytes of an object with the named top-level keys removed.
///
/// Hashes and signatures are computed over an artifact minus the fields that
/// carry them. Non-object values are encoded unchanged.
pub fn canonical_bytes_without(value: &Value, excluded: &[&str]) -> Vec<u8> {
    match value {
        Value::Object(map) => {
            let mut buf = String::new();
            encode_object_canonical(&mut buf, map, excluded);
            buf.into_bytes()
        }
        other => canonical_bytes(other),
    }
}

/// Recursively encode a JSON value.
fn encode_value_to(buf: &mut String, value: &Value) {
    match value {
        Value::Null => buf.push_str("null"),
        Value::Bool(b) => buf.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => encode_number(buf, n),
        Value::String(s) => encode_string(buf, s),
        Value::Array(items) => {
            buf.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    buf.push(',');
                }
                encode_value_to(buf, item);
            }
            buf.push(']');
        }
        Value::Object(map) => encode_object_canonical(buf, map, &[]),
    }
}

/// Encode an object with keys sorted by code point.
///
/// `serde_json::Map` may preserve insertion order depending on features
/// enabled elsewhere in the build, so keys are always sorted here.
fn encode_object_canonical(buf: &mut String, map: &Map<String, Value>, excluded: &[&str]) {
    let mut entries: Vec<(&String, &Value)> = map
        .iter()
        .filter(|(k, _)| !excluded.contains(&k.as_str()))
        .collect();
    // UTF-8 byte order equals code point order.
    entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

    buf.push('{');
    for (i, (key, value)) in entries.into_iter().enumerate() {
        if i > 0 {
            buf.push(',');
        }
        encode_string(buf, key);
        buf.push(':');
        encode_value_to(buf, value);
    }
    buf.push('}');
}

/// Encode a string with ASCII-only escaping.
fn encode_string(buf: &mut String, s: &str) {
    buf.push('"');
    for c in s.chars() {
        match c {
            '"' => buf.push_str("\\\""),
            '\\' => buf.push_str("\\\\"),
            '\n' => buf.push_str("\\n"),
            '\r' => buf.push_str("\\r"),
            '\t' => buf.push_str("\\t"),
            '\u{08}' => buf.push_str("\\b"),
            '\u{0c}' => buf.push_str("\\f"),
            ' '..='~' => buf.push(c),
            _ => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    buf.push_str(&format!("\\u{:04x}", unit));
                }
            }
        }
    }
    buf.push('"');
}

/// Encode a number.
fn encode_number(buf: &mut String, n: &Number) {
    if let Some(i) = n.as_i64() {
        buf.push_str(&i.to_string());
    } else if let Some(u) = n.as_u64() {
        buf.push_str(&u.to_string());
    } else if let Some(f) = n.as_f64() {
        encode_float(buf, f);
    } else {
        // Arbitrary-precision numbers keep their literal text.
        buf.push_str(&n.to_string());
    }
}

/// Encode a finite float in shortest round-trip form.
///
/// Fixed notation when the decimal exponent is in `-4..16`, otherwise
/// `d.ddde+XX` with at least two exponent digits.
fn encode_float(buf: &mut String, f: f64) {
    // `{:e}` yields the shortest round-trip digits, e.g. "1.5e-7", "1e16".
    let sci = format!("{:e}", f);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };
    let (negative, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, mantissa),
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();

    if negative {
        buf.push('-');
    }

    if (-4..16).contains(&exp) {
        if exp >= 0 {
            let int_len = (exp + 1) as usize;
            if digits.len() <= int_len {
                buf.push_str(&digits);
                buf.push_str(&"0".repeat(int_len - digits.len()));
                buf.push_str(".0");
            } else {
                buf.push_str(&digits[..int_len]);
                buf.push('.');
                buf.push_str(&digits[int_len..]);
            }
        } else {
            buf.push_str("0.");
            buf.push_str(&"0".repeat((-exp - 1) as usize));
            buf.push_str(&digits);
        }
    } else {
        buf.push_str(&digits[..1]);
        if digits.len() > 1 {
            buf.push('.');
            buf.push_str(&digits[1..]);
        }
        let sign = if exp < 0 { '-' } else { '+' };
        buf.push_str(&format!("e{}{:02}", sign, exp.abs()));
    }
}
