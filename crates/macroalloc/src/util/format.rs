/// Format a fraction as a percentage (0.1234 -> "12.34%")
pub fn format_percentage(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

/// Format a band value already expressed in percent (12.5 -> "12.5%")
pub fn format_percent_points(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}%")
    } else {
        format!("{value:.1}%")
    }
}

/// Format an optional ratio, "n/a" when undefined
pub fn format_ratio(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.3}"))
}

/// Format a growth multiple as a signed change (1.052 -> "+5.20%")
pub fn format_growth(value: f64) -> String {
    let change = (value - 1.0) * 100.0;
    if change >= 0.0 {
        format!("+{change:.2}%")
    } else {
        format!("{change:.2}%")
    }
}
