use crate::currency::BASE_CURRENCY;

fn grouped(abs: f64) -> String {
    let fixed = format!("{abs:.2}");
    let (int_part, dec_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut out = String::new();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    format!("{out}.{dec_part}")
}

/// USD with thousands separators: $1,234.56, -$500.00
pub fn money(val: f64) -> String {
    if val < 0.0 {
        format!("-${}", grouped(val.abs()))
    } else {
        format!("${}", grouped(val))
    }
}

/// An amount in its own currency: USD renders as `money`, others as `1,234.56 EUR`.
pub fn amount(val: f64, currency: &str) -> String {
    if currency.eq_ignore_ascii_case(BASE_CURRENCY) {
        return money(val);
    }
    let sign = if val < 0.0 { "-" } else { "" };
    format!("{sign}{} {}", grouped(val.abs()), currency.to_uppercase())
}
