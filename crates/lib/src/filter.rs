//! Boilerplate detection for ticket message lines.
//!
//! Markers come from [`FilterConfig`]: literal substrings and regular expressions. A line that
//! contains a marker anywhere is treated as automated text and discarded in full.

use crate::config::FilterConfig;
use regex::RegexSet;

#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("invalid boilerplate pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Compiled boilerplate markers.
#[derive(Debug, Clone)]
pub struct MessageFilter {
    substrings: Vec<String>,
    patterns: RegexSet,
}

impl MessageFilter {
    pub fn new(config: &FilterConfig) -> Result<Self, FilterError> {
        let patterns = RegexSet::new(&config.patterns)?;
        let substrings = config
            .substrings
            .iter()
            .filter(|s| !s.is_empty())
            .cloned()
            .collect();
        Ok(Self {
            substrings,
            patterns,
        })
    }

    /// True if the line is blank, contains a configured substring, or matches a configured pattern.
    pub fn is_boilerplate(&self, line: &str) -> bool {
        if line.trim().is_empty() {
            return true;
        }
        self.substrings.iter().any(|s| line.contains(s.as_str())) || self.patterns.is_match(line)
    }
}

impl Default for MessageFilter {
    /// A filter with no markers: only blank lines are boilerplate.
    fn default() -> Self {
        Self {
            substrings: Vec::new(),
            patterns: RegexSet::empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> MessageFilter {
        MessageFilter::new(&FilterConfig {
            substrings: vec![
                "Digite 1 para".to_string(),
                "Sua mensagem foi recebida".to_string(),
            ],
            patterns: vec![
                r"(?i)^\s*\d+\s*[-–)]\s*(falar com atendente|segunda via|rastrear pedido)".to_string(),
                r"https?://(www\.)?suporte\.example\.com\S*".to_string(),
            ],
        })
        .unwrap()
    }

    #[test]
    fn configured_markers_are_boilerplate() {
        let f = filter();
        assert!(f.is_boilerplate("Olá! Digite 1 para falar com um atendente"));
        assert!(f.is_boilerplate("Sua mensagem foi recebida e será respondida em breve."));
        assert!(f.is_boilerplate("2 - Rastrear pedido"));
        assert!(f.is_boilerplate("Acesse https://suporte.example.com/faq para mais informações"));
    }

    #[test]
    fn ordinary_lines_pass() {
        let f = filter();
        assert!(!f.is_boilerplate("Meu pedido está atrasado"));
        assert!(!f.is_boilerplate("Quero falar sobre a segunda parcela"));
    }

    #[test]
    fn blank_lines_are_boilerplate_even_without_markers() {
        let f = MessageFilter::default();
        assert!(f.is_boilerplate(""));
        assert!(f.is_boilerplate("  \n\t"));
        assert!(!f.is_boilerplate("oi"));
    }

    #[test]
    fn empty_substring_marker_is_ignored() {
        let f = MessageFilter::new(&FilterConfig {
            substrings: vec![String::new()],
            patterns: vec![],
        })
        .unwrap();
        assert!(!f.is_boilerplate("qualquer texto"));
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = MessageFilter::new(&FilterConfig {
            substrings: vec![],
            patterns: vec!["(unclosed".to_string()],
        })
        .unwrap_err();
        assert!(err.to_string().starts_with("invalid boilerplate pattern"));
    }
}
