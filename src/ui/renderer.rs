// Renderer module - formatting utilities shared by the views and the layout

/// Group digits in threes: `1234567` -> `1,234,567`
pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Bounty amount for a ship card
pub fn format_credits(value: u64) -> String {
    format!("{} credits", format_thousands(value))
}

/// Kill count for a ship card
pub fn format_kills(count: u64) -> String {
    format!("{} kill(s)", count)
}

/// Restore roman numerals mangled by title-casing (`Cobra Mk Iii` -> `Cobra Mk III`)
pub fn fix_ship_name(name: &str) -> String {
    name.replacen("Iv", "IV", 1)
        .replacen("Iii", "III", 1)
        .replacen("Ii", "II", 1)
}
