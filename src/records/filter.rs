//! Builders for the string filter expressions understood by the record API.

/// Quotes a value for use inside a filter expression
pub fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

/// `field="value"`
pub fn eq(field: &str, value: &str) -> String {
    format!("{}={}", field, quote(value))
}

/// `field="a" || field="b" || ...`; empty input yields an empty string
pub fn any_eq<S: AsRef<str>>(field: &str, values: &[S]) -> String {
    values
        .iter()
        .map(|value| eq(field, value.as_ref()))
        .collect::<Vec<_>>()
        .join(" || ")
}
