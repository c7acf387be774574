/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Parse a numeric setting, falling back to `default` when the value is absent, unparseable or below `min`.
pub fn parse_numeric_setting<T>(value: Option<String>, default: T, min: T) -> T
where T: std::str::FromStr + PartialOrd + Copy {
    value.and_then(|v| v.trim().parse::<T>().ok()).filter(|v| *v >= min).unwrap_or(default)
}
