//! Danish display formatting
//!
//! Pure functions of (instant, timezone): weekday abbreviation, 24h hour,
//! decimal-comma prices with a `kr` suffix and a full timestamp.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use chrono_tz::Tz;

use crate::error::{ElprisError, Result};

/// Formatting service used when projecting points for display
pub trait DisplayFormatter: Send + Sync {
    /// Short weekday name of `instant` in the target zone
    fn weekday_short(&self, instant: DateTime<Utc>) -> String;

    /// Two-digit 24h hour of `instant` in the target zone
    fn hour_2digit(&self, instant: DateTime<Utc>) -> String;

    /// Price with decimal comma and currency suffix
    fn price(&self, value: f64) -> String;

    /// Full local date and time
    fn date_time(&self, instant: DateTime<Utc>) -> String;

    /// Bar label, e.g. `Ons. - kl. 14`
    fn hour_label(&self, instant: DateTime<Utc>) -> String {
        format!(
            "{} - kl. {}",
            capitalize(&self.weekday_short(instant)),
            self.hour_2digit(instant)
        )
    }
}

/// da-DK formatting in a fixed civil timezone
#[derive(Debug, Clone, Copy)]
pub struct DanishFormatter {
    tz: Tz,
}

impl DanishFormatter {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        let tz = name
            .parse::<Tz>()
            .map_err(|_| ElprisError::config(format!("Unknown timezone '{}'", name)))?;
        Ok(Self::new(tz))
    }
}

impl Default for DanishFormatter {
    fn default() -> Self {
        Self::new(chrono_tz::Europe::Copenhagen)
    }
}

impl DisplayFormatter for DanishFormatter {
    fn weekday_short(&self, instant: DateTime<Utc>) -> String {
        danish_weekday_short(instant.with_timezone(&self.tz).weekday()).to_string()
    }

    fn hour_2digit(&self, instant: DateTime<Utc>) -> String {
        format!("{:02}", instant.with_timezone(&self.tz).hour())
    }

    fn price(&self, value: f64) -> String {
        format_price_dkk(value)
    }

    fn date_time(&self, instant: DateTime<Utc>) -> String {
        format_last_updated(instant, self.tz)
    }
}

fn danish_weekday_short(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "man.",
        Weekday::Tue => "tirs.",
        Weekday::Wed => "ons.",
        Weekday::Thu => "tors.",
        Weekday::Fri => "fre.",
        Weekday::Sat => "lør.",
        Weekday::Sun => "søn.",
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Danish number formatting with comma decimals and trailing " kr"
pub fn format_price_dkk(value: f64) -> String {
    if value.is_nan() {
        return "NaN kr".to_string();
    }
    if value.is_infinite() {
        let sign = if value < 0.0 { "-" } else { "" };
        return format!("{}∞ kr", sign);
    }

    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if value.is_sign_negative() && fixed != "0.00" {
        "-"
    } else {
        ""
    };
    format!("{}{},{} kr", sign, grouped, frac_part)
}

/// `dd.MM.yyyy HH.mm.ss` in the given zone
pub fn format_last_updated(instant: DateTime<Utc>, tz: Tz) -> String {
    instant
        .with_timezone(&tz)
        .format("%d.%m.%Y %H.%M.%S")
        .to_string()
}
