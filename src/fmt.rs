/// Format an amount with thousands separators: 1,234.56. Whole amounts drop
/// the decimal part entirely (ledger entries are usually round numbers).
pub fn money(val: f64) -> String {
    let negative = val < 0.0;
    let abs = val.abs();
    let whole = abs.fract() < 1e-9;
    let rendered = if whole {
        format!("{:.0}", abs)
    } else {
        format!("{:.2}", abs)
    };
    let parts: Vec<&str> = rendered.split('.').collect();
    let int_part = parts[0];

    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();

    let body = if parts.len() > 1 {
        format!("{with_commas}.{}", parts[1])
    } else {
        with_commas
    };
    if negative {
        format!("-{body}")
    } else {
        body
    }
}

/// Percent with one decimal place, e.g. 90.0%.
pub fn percent(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}
