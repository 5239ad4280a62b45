use crate::core::types::DocValue;

/// sdbm string hash over Unicode scalar values.
pub fn str_hash(s: &str) -> u64 {
    let mut hash: u64 = 0;
    for c in s.chars() {
        hash = (c as u64)
            .wrapping_add(hash << 6)
            .wrapping_add(hash << 16)
            .wrapping_sub(hash);
    }
    hash
}

/// Textual form of a value as it is fed to the hash.
pub fn index_text(value: &DocValue) -> String {
    match value {
        DocValue::String(s) => s.clone(),
        DocValue::Number(n) => n.as_f64().map(number_text).unwrap_or_else(|| n.to_string()),
        DocValue::Bool(b) => b.to_string(),
        DocValue::Null => String::new(),
        nested => nested.to_string(),
    }
}

/// Every number is treated as a double and printed with the shortest digits
/// that read back the same. Exponents below -4 or from 6 on switch to
/// `1.5e+06` style with a signed, two-digit exponent.
fn number_text(f: f64) -> String {
    let sci = format!("{:e}", f);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let exp: i32 = exp.parse().unwrap_or(0);
    if (-4..6).contains(&exp) {
        return f.to_string();
    }
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{}e{}{:02}", mantissa, sign, exp.abs())
}

/// Hashed key of an indexable value. Null values are never indexed.
pub fn index_key(value: &DocValue) -> Option<u64> {
    if value.is_null() {
        return None;
    }
    Some(str_hash(&index_text(value)))
}

/// Shard owning the index entry for `key`.
pub fn route(key: u64, shard_count: usize) -> usize {
    (key % shard_count as u64) as usize
}
