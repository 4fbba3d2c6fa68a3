//! Facts derived from one affidavit's data context
//!
//! Everything here is computed once per render from a read-only context.
//! Field names follow the job records the templates are written against:
//! `attempts[]` entries carry `timestamp` (or `date`), `status`, `address`,
//! `lat`/`lng` and `notes`; `documents[]` entries are strings or `{title}`.

use chrono::NaiveDateTime;
use chrono_tz::Tz;
use lazy_static::lazy_static;
use regex::Regex;

use crate::config::FormatSettings;
use crate::helpers::date::{format_moment_in, format_timestamp, parse_timestamp};
use crate::helpers::format::{format_address, format_currency, format_phone, CurrencyStyle};
use crate::template::Value;

/// Status that marks an attempt as the service itself
pub const SERVED_STATUS: &str = "served";

/// Derived view over a data context
#[derive(Debug, Clone)]
pub struct AffidavitFacts {
    context: Value,
    tz: Option<Tz>,
    date_format: String,
    long_date_format: String,
    time_format: String,
    currency: CurrencyStyle,
    now: NaiveDateTime,
    successful_attempt: Option<Value>,
    plaintiff: String,
    defendant: String,
}

impl AffidavitFacts {
    pub fn compute(context: &Value, settings: &FormatSettings, now: NaiveDateTime) -> Self {
        let successful_attempt = context
            .lookup("attempts")
            .as_array()
            .and_then(|attempts| {
                attempts
                    .iter()
                    .rev()
                    .find(|a| a.lookup("status").to_output_string().eq_ignore_ascii_case(SERVED_STATUS))
                    .cloned()
            });

        let caption = context.lookup("case_caption").to_output_string();
        let (split_plaintiff, split_defendant) = split_caption(&caption);
        let plaintiff = non_empty(context.lookup("plaintiff").to_output_string()).unwrap_or(split_plaintiff);
        let defendant = non_empty(context.lookup("defendant").to_output_string()).unwrap_or(split_defendant);

        Self {
            context: context.clone(),
            tz: settings.tz(),
            date_format: settings.date_format.clone(),
            long_date_format: settings.long_date_format.clone(),
            time_format: settings.time_format.clone(),
            currency: CurrencyStyle::for_locale(&settings.locale),
            now,
            successful_attempt,
            plaintiff,
            defendant,
        }
    }

    pub fn context(&self) -> &Value {
        &self.context
    }

    /// Last attempt whose status is `served`
    pub fn successful_attempt(&self) -> Option<&Value> {
        self.successful_attempt.as_ref()
    }

    pub fn plaintiff(&self) -> &str {
        &self.plaintiff
    }

    pub fn defendant(&self) -> &str {
        &self.defendant
    }

    /// Plain text of a context path
    pub fn text(&self, path: &str) -> String {
        self.context.lookup(path).to_output_string()
    }

    /// First non-empty text among several context paths
    pub fn first_text(&self, paths: &[&str]) -> String {
        paths
            .iter()
            .map(|p| self.text(p))
            .find(|s| !s.is_empty())
            .unwrap_or_default()
    }

    fn attempt_field(&self, names: &[&str]) -> String {
        let Some(attempt) = &self.successful_attempt else {
            return String::new();
        };
        names
            .iter()
            .map(|n| attempt.lookup(n).to_output_string())
            .find(|s| !s.is_empty())
            .unwrap_or_default()
    }

    /// When service happened: explicit `service_date`, else the served attempt
    pub fn service_timestamp(&self) -> Value {
        let explicit = self.context.lookup("service_date");
        if !explicit.is_undefined() && explicit.to_output_string() != "" {
            return explicit;
        }
        match &self.successful_attempt {
            Some(attempt) => attempt_timestamp(attempt),
            None => Value::Undefined,
        }
    }

    pub fn service_date_long(&self) -> String {
        format_timestamp(&self.service_timestamp(), &self.long_date_format, self.tz)
    }

    pub fn service_date_short(&self) -> String {
        format_timestamp(&self.service_timestamp(), &self.date_format, self.tz)
    }

    pub fn service_time(&self) -> String {
        let explicit = self.text("service_time");
        if !explicit.is_empty() {
            return explicit;
        }
        match &self.successful_attempt {
            Some(attempt) => {
                let ts = attempt_timestamp(attempt);
                format_timestamp(&ts, &self.time_format, self.tz)
            }
            None => String::new(),
        }
    }

    pub fn service_address(&self) -> String {
        let explicit = address_text(&self.context.lookup("service_address"));
        if !explicit.is_empty() {
            return explicit;
        }
        match &self.successful_attempt {
            Some(attempt) => address_text(&attempt.lookup("address")),
            None => String::new(),
        }
    }

    pub fn service_latitude(&self) -> String {
        self.attempt_field(&["lat", "latitude", "coordinates.lat", "location.lat"])
    }

    pub fn service_longitude(&self) -> String {
        self.attempt_field(&["lng", "longitude", "lon", "coordinates.lng", "location.lng"])
    }

    pub fn service_coordinates(&self) -> String {
        let (lat, lng) = (self.service_latitude(), self.service_longitude());
        if lat.is_empty() || lng.is_empty() {
            return String::new();
        }
        format!("{}, {}", lat, lng)
    }

    pub fn service_notes(&self) -> String {
        self.attempt_field(&["notes", "note"])
    }

    fn attempts(&self) -> Vec<Value> {
        self.context
            .lookup("attempts")
            .as_array()
            .map(<[Value]>::to_vec)
            .unwrap_or_default()
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts().len()
    }

    /// One line per attempt: `date time - Status - address`
    pub fn attempts_list(&self) -> String {
        self.attempts()
            .iter()
            .map(|attempt| {
                let ts = attempt_timestamp(attempt);
                let when = format_timestamp(
                    &ts,
                    &format!("{} {}", self.date_format, self.time_format),
                    self.tz,
                );
                let status = humanize(&attempt.lookup("status").to_output_string());
                let address = address_text(&attempt.lookup("address"));
                [when, status, address]
                    .into_iter()
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join(" - ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn first_attempt_date(&self) -> String {
        match self.attempts().first() {
            Some(a) => format_timestamp(&attempt_timestamp(a), &self.date_format, self.tz),
            None => String::new(),
        }
    }

    pub fn last_attempt_date(&self) -> String {
        match self.attempts().last() {
            Some(a) => format_timestamp(&attempt_timestamp(a), &self.date_format, self.tz),
            None => String::new(),
        }
    }

    fn document_titles(&self) -> Vec<String> {
        self.context
            .lookup("documents")
            .as_array()
            .unwrap_or_default()
            .iter()
            .map(|doc| match doc {
                Value::Object(_) => doc.lookup("title").to_output_string(),
                other => other.to_output_string(),
            })
            .filter(|t| !t.is_empty())
            .collect()
    }

    /// Newline-joined document titles
    pub fn documents_list(&self) -> String {
        self.document_titles().join("\n")
    }

    pub fn document_count(&self) -> usize {
        self.document_titles().len()
    }

    /// Labelled physical description of the person served
    pub fn recipient_description(&self) -> String {
        let description = self.context.lookup("recipient_description");
        if let Value::String(text) = &description {
            return text.clone();
        }
        [
            ("Gender", "gender"),
            ("Age", "age"),
            ("Height", "height"),
            ("Weight", "weight"),
            ("Hair", "hair"),
            ("Race", "race"),
        ]
        .iter()
        .filter_map(|(label, key)| {
            let value = description.lookup(key).to_output_string();
            (!value.is_empty()).then(|| format!("{}: {}", label, value))
        })
        .collect::<Vec<_>>()
        .join(", ")
    }

    pub fn company_address(&self) -> String {
        address_text(&self.context.lookup("company.address"))
    }

    pub fn company_phone(&self) -> String {
        format_phone(&self.context.lookup("company.phone"))
    }

    pub fn fee(&self) -> String {
        let fee = self.context.lookup("fee");
        if fee.is_undefined() {
            return String::new();
        }
        format_currency(&fee, &self.currency)
    }

    pub fn current_date_long(&self) -> String {
        format_moment_in(&self.now, &self.long_date_format, self.tz)
    }

    pub fn current_date_short(&self) -> String {
        format_moment_in(&self.now, &self.date_format, self.tz)
    }

    /// True when the served attempt has a usable timestamp
    pub fn has_service_time(&self) -> bool {
        parse_timestamp(&self.service_timestamp(), self.tz).is_some()
    }
}

fn attempt_timestamp(attempt: &Value) -> Value {
    let ts = attempt.lookup("timestamp");
    if ts.is_undefined() {
        attempt.lookup("date")
    } else {
        ts
    }
}

fn address_text(value: &Value) -> String {
    match value {
        Value::Object(_) => format_address(std::slice::from_ref(value)),
        other => other.to_output_string(),
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s.trim().to_string())
    }
}

/// `not_served` -> `Not Served`
pub fn humanize(status: &str) -> String {
    status
        .split(['_', '-', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

lazy_static! {
    /// A standalone `v.`, `vs.` or `v` between the parties
    static ref VERSUS: Regex = Regex::new(r"\s+vs?\.?\s+").expect("versus pattern");
}

/// Split `Plaintiff v. Defendant` on the first standalone `v.`
pub fn split_caption(caption: &str) -> (String, String) {
    match VERSUS.find(caption) {
        Some(m) => (
            caption[..m.start()].trim().trim_end_matches(',').trim().to_string(),
            caption[m.end()..].trim().to_string(),
        ),
        None => (caption.trim().to_string(), String::new()),
    }
}
