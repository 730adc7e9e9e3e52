//! Turn raw service output into a [`ClassificationResult`].
//!
//! The service is asked for pure JSON but does not always comply, so parsing runs an ordered
//! chain of strategies and takes the first that yields a JSON object. When every strategy fails
//! the fields fall back: subject from [`SubjectClassifier`], sentiment "neutro", empty reply.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::model::{ClassificationResult, Sentiment, Subject};
use crate::subject::SubjectClassifier;

type Fields = Map<String, Value>;

/// A parsing strategy: `Some` with the object's fields, or `None` to try the next one.
type Strategy = fn(&str) -> Option<Fields>;

const STRATEGIES: &[Strategy] = &[parse_strict, parse_embedded];

static EMBEDDED_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*?\}").expect("static regex"));

/// The whole output is one JSON object.
fn parse_strict(raw: &str) -> Option<Fields> {
    match serde_json::from_str::<Value>(raw.trim()) {
        Ok(Value::Object(fields)) => Some(fields),
        _ => None,
    }
}

/// The first shortest `{...}` span in the output is a JSON object.
fn parse_embedded(raw: &str) -> Option<Fields> {
    let span = EMBEDDED_OBJECT.find(raw)?;
    parse_strict(span.as_str())
}

/// Fields of the first strategy that succeeds, or an empty map.
pub fn extract_fields(raw: &str) -> Fields {
    STRATEGIES
        .iter()
        .find_map(|strategy| strategy(raw))
        .unwrap_or_default()
}

fn string_field<'a>(fields: &'a Fields, key: &str) -> Option<&'a str> {
    fields.get(key).and_then(Value::as_str)
}

/// Parse `raw`; `fallback_text` feeds the local subject classifier when `assunto` is missing or empty.
pub fn parse(
    raw: &str,
    fallback_text: &str,
    catalog: &[Subject],
    classifier: &SubjectClassifier,
) -> ClassificationResult {
    let fields = extract_fields(raw);
    if fields.is_empty() {
        log::debug!("parse: no JSON object in service output, using fallbacks");
    }

    let subject = match string_field(&fields, "assunto").map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => classifier.classify_subject(fallback_text, catalog),
    };

    let sentiment = match string_field(&fields, "sentiment") {
        Some(label) => {
            let label = label.trim().to_lowercase();
            Sentiment::from_label(&label).unwrap_or_else(|| {
                log::debug!("parse: unknown sentiment {:?}, using neutro", label);
                Sentiment::Neutro
            })
        }
        None => Sentiment::Neutro,
    };

    let suggested_reply = string_field(&fields, "response")
        .unwrap_or_default()
        .to_string();

    ClassificationResult {
        subject,
        sentiment,
        suggested_reply,
    }
}
