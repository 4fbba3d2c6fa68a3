//! Flat placeholder substitution
//!
//! A flat template only contains `{{name}}` tokens. Each token is matched
//! whole, looked up in the placeholder table, and failing that read as a
//! dotted path into the data context. Anything unresolved becomes "".

pub mod constants;
pub mod derived;

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::{Captures, Regex};

pub use constants::Constants;
pub use derived::AffidavitFacts;

use crate::template::Value;

lazy_static! {
    static ref PLACEHOLDER_TOKEN: Regex =
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z0-9_]+)*)\s*\}\}")
            .expect("placeholder token pattern");
}

/// Every name the flat table knows about
pub const PLACEHOLDER_NAMES: &[&str] = &[
    "case_number",
    "court_name",
    "court_county",
    "court_state",
    "case_caption",
    "plaintiff",
    "defendant",
    "job_number",
    "client_name",
    "recipient_name",
    "recipient_title",
    "recipient_relationship",
    "recipient_gender",
    "recipient_age",
    "recipient_height",
    "recipient_weight",
    "recipient_hair",
    "recipient_race",
    "recipient_description",
    "service_date",
    "service_date_short",
    "service_time",
    "service_address",
    "service_method",
    "service_latitude",
    "service_longitude",
    "service_coordinates",
    "service_notes",
    "attempt_count",
    "attempts_list",
    "first_attempt_date",
    "last_attempt_date",
    "documents_list",
    "document_count",
    "server_name",
    "server_license",
    "company_name",
    "company_address",
    "company_phone",
    "company_email",
    "fee",
    "current_date",
    "current_date_short",
    "notes",
];

/// Value of one table entry, or `None` if the name is not in the table
pub fn resolve_placeholder(name: &str, facts: &AffidavitFacts) -> Option<String> {
    let value = match name {
        "case_number" => facts.first_text(&["case_number", "case.number"]),
        "court_name" => facts.first_text(&["court_name", "court.name"]),
        "court_county" => facts.first_text(&["court_county", "court.county"]),
        "court_state" => facts.first_text(&["court_state", "court.state"]),
        "case_caption" => facts.text("case_caption"),
        "plaintiff" => facts.plaintiff().to_string(),
        "defendant" => facts.defendant().to_string(),
        "job_number" => facts.first_text(&["job_number", "job_id", "id"]),
        "client_name" => facts.first_text(&["client_name", "client.name"]),
        "recipient_name" => facts.first_text(&["recipient_name", "recipient.name"]),
        "recipient_title" => facts.first_text(&["recipient_title", "recipient.title"]),
        "recipient_relationship" => {
            facts.first_text(&["recipient_relationship", "recipient.relationship"])
        }
        "recipient_gender" => facts.first_text(&["recipient_description.gender", "recipient.gender"]),
        "recipient_age" => facts.first_text(&["recipient_description.age", "recipient.age"]),
        "recipient_height" => facts.first_text(&["recipient_description.height", "recipient.height"]),
        "recipient_weight" => facts.first_text(&["recipient_description.weight", "recipient.weight"]),
        "recipient_hair" => facts.first_text(&["recipient_description.hair", "recipient.hair"]),
        "recipient_race" => facts.first_text(&["recipient_description.race", "recipient.race"]),
        "recipient_description" => facts.recipient_description(),
        "service_date" => facts.service_date_long(),
        "service_date_short" => facts.service_date_short(),
        "service_time" => facts.service_time(),
        "service_address" => facts.service_address(),
        "service_method" => facts.first_text(&["service_method", "service_type"]),
        "service_latitude" => facts.service_latitude(),
        "service_longitude" => facts.service_longitude(),
        "service_coordinates" => facts.service_coordinates(),
        "service_notes" => facts.service_notes(),
        "attempt_count" => facts.attempt_count().to_string(),
        "attempts_list" => facts.attempts_list(),
        "first_attempt_date" => facts.first_attempt_date(),
        "last_attempt_date" => facts.last_attempt_date(),
        "documents_list" => facts.documents_list(),
        "document_count" => facts.document_count().to_string(),
        "server_name" => facts.first_text(&["server_name", "server.name"]),
        "server_license" => facts.first_text(&["server_license", "server.license"]),
        "company_name" => facts.first_text(&["company.name", "company_name"]),
        "company_address" => facts.company_address(),
        "company_phone" => facts.company_phone(),
        "company_email" => facts.first_text(&["company.email", "company_email"]),
        "fee" => facts.fee(),
        "current_date" => facts.current_date_long(),
        "current_date_short" => facts.current_date_short(),
        "notes" => facts.text("notes"),
        _ => return None,
    };
    Some(value)
}

/// Replace every whole `{{name}}` token in a flat template
pub fn substitute(template: &str, facts: &AffidavitFacts) -> String {
    PLACEHOLDER_TOKEN
        .replace_all(template, |caps: &Captures| {
            let name = &caps[1];
            resolve_placeholder(name, facts)
                .unwrap_or_else(|| facts.context().lookup(name).to_output_string())
        })
        .into_owned()
}

/// True if the token would be handled by flat substitution
pub fn is_flat_token(inner: &str) -> bool {
    let candidate = format!("{{{{{}}}}}", inner);
    PLACEHOLDER_TOKEN
        .find(&candidate)
        .map(|m| m.as_str().len() == candidate.len())
        .unwrap_or(false)
}

/// Table values as fallbacks for structured templates
pub fn globals(facts: &AffidavitFacts) -> IndexMap<String, Value> {
    PLACEHOLDER_NAMES
        .iter()
        .filter_map(|name| {
            resolve_placeholder(name, facts).map(|v| (name.to_string(), Value::String(v)))
        })
        .collect()
}
