use crate::metadata::MetadataRecord;
use crate::sanitize::finalize_stem;
use chrono::{Datelike, NaiveDateTime, Timelike};

pub const DEFAULT_TEMPLATE: &str = "{datetime}_{camera}_{original}";
pub const DEFAULT_DATE_FORMAT: &str = "YYYY-MM-DD";
pub const DEFAULT_TIME_FORMAT: &str = "HHmmss";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplatePart {
    Literal(String),
    Token(Token),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Date,
    Time,
    DateTime,
    Camera,
    Model,
    Lens,
    Location,
    City,
    Country,
    Original,
    Counter,
}

/// Per-file inputs to a render besides the metadata itself.
#[derive(Debug, Clone)]
pub struct RenderContext<'a> {
    /// Original file stem, without extension.
    pub original: &'a str,
    pub counter: u32,
    pub date_format: &'a str,
    pub time_format: &'a str,
    /// Used as the capture time when the file has no metadata at all.
    pub fallback_time: NaiveDateTime,
}

/// Splits a template into literals and known placeholders. Unknown
/// placeholders and stray braces stay in the output verbatim, so parsing
/// cannot fail.
pub fn parse_template(input: &str) -> Vec<TemplatePart> {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut rest = input;

    while let Some(open) = rest.find('{') {
        literal.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];

        let token = after_open
            .find('}')
            .and_then(|close| parse_token(&after_open[..close]).map(|t| (t, close)));

        match token {
            Some((token, close)) => {
                if !literal.is_empty() {
                    parts.push(TemplatePart::Literal(std::mem::take(&mut literal)));
                }
                parts.push(TemplatePart::Token(token));
                rest = &after_open[close + 1..];
            }
            None => {
                literal.push('{');
                rest = after_open;
            }
        }
    }
    literal.push_str(rest);

    if !literal.is_empty() {
        parts.push(TemplatePart::Literal(literal));
    }

    parts
}

/// Renders a template into a filesystem-safe file stem.
pub fn render(template: &str, record: Option<&MetadataRecord>, ctx: &RenderContext<'_>) -> String {
    let parts = parse_template(template);
    finalize_stem(&render_template(&parts, record, ctx))
}

/// Substitutes placeholders without any filename post-processing.
pub fn render_template(
    parts: &[TemplatePart],
    record: Option<&MetadataRecord>,
    ctx: &RenderContext<'_>,
) -> String {
    let timestamp = match record {
        Some(record) => record.capture_time(),
        None => Some(ctx.fallback_time),
    };
    let coordinates = record.and_then(MetadataRecord::coordinates);

    let mut output = String::new();
    for part in parts {
        match part {
            TemplatePart::Literal(s) => output.push_str(s),
            TemplatePart::Token(token) => {
                let value = match token {
                    Token::Date => timestamp
                        .map(|t| format_date(ctx.date_format, &t))
                        .unwrap_or_default(),
                    Token::Time => timestamp
                        .map(|t| format_time(ctx.time_format, &t))
                        .unwrap_or_default(),
                    Token::DateTime => timestamp
                        .map(|t| {
                            format!(
                                "{}_{}",
                                format_date(ctx.date_format, &t),
                                format_time(ctx.time_format, &t)
                            )
                        })
                        .unwrap_or_default(),
                    Token::Camera => strip_whitespace(record.and_then(|r| r.make.as_deref())),
                    Token::Model => strip_whitespace(record.and_then(|r| r.model.as_deref())),
                    Token::Lens => hyphenate(record.and_then(|r| r.lens_model.as_deref())),
                    Token::Location => coordinates
                        .map(|(lat, lon)| format!("{lat:.4}_{lon:.4}"))
                        .unwrap_or_default(),
                    Token::City => location_field(record, coordinates, &["City"]),
                    Token::Country => {
                        location_field(record, coordinates, &["Country", "CountryName"])
                    }
                    Token::Original => ctx.original.to_string(),
                    Token::Counter => format!("{:03}", ctx.counter),
                };
                output.push_str(&value);
            }
        }
    }

    output
}

fn parse_token(token: &str) -> Option<Token> {
    match token {
        "date" => Some(Token::Date),
        "time" => Some(Token::Time),
        "datetime" => Some(Token::DateTime),
        "camera" => Some(Token::Camera),
        "model" => Some(Token::Model),
        "lens" => Some(Token::Lens),
        "location" => Some(Token::Location),
        "city" => Some(Token::City),
        "country" => Some(Token::Country),
        "original" => Some(Token::Original),
        "counter" => Some(Token::Counter),
        _ => None,
    }
}

pub fn format_date(format: &str, t: &NaiveDateTime) -> String {
    format
        .replace("YYYY", &format!("{:04}", t.year()))
        .replace("MM", &format!("{:02}", t.month()))
        .replace("DD", &format!("{:02}", t.day()))
}

pub fn format_time(format: &str, t: &NaiveDateTime) -> String {
    format
        .replace("HH", &format!("{:02}", t.hour()))
        .replace("mm", &format!("{:02}", t.minute()))
        .replace("ss", &format!("{:02}", t.second()))
}

fn strip_whitespace(value: Option<&str>) -> String {
    value
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

fn hyphenate(value: Option<&str>) -> String {
    value
        .unwrap_or_default()
        .replace(['/', '\\'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

fn location_field(
    record: Option<&MetadataRecord>,
    coordinates: Option<(f64, f64)>,
    keys: &[&str],
) -> String {
    if coordinates.is_none() {
        return String::new();
    }
    record
        .and_then(|r| r.field(keys))
        .map(|v| v.to_string())
        .unwrap_or_default()
}
