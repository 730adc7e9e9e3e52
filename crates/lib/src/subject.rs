//! Local subject classification by text similarity.
//!
//! Used when the classification service returns no subject. Deterministic and side-effect-free.

use crate::model::Subject;
use crate::similarity;

pub const DEFAULT_THRESHOLD: f64 = 0.70;
pub const DEFAULT_FALLBACK: &str = "Outro";

#[derive(Debug, Clone)]
pub struct SubjectClassifier {
    threshold: f64,
    fallback: Subject,
}

impl Default for SubjectClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD, DEFAULT_FALLBACK)
    }
}

impl SubjectClassifier {
    pub fn new(threshold: f64, fallback: impl Into<Subject>) -> Self {
        Self {
            threshold,
            fallback: fallback.into(),
        }
    }

    /// Highest-scoring catalog entry and its score. The first entry wins ties.
    pub fn best_match<'c>(&self, text: &str, catalog: &'c [Subject]) -> Option<(&'c Subject, f64)> {
        catalog
            .iter()
            .map(|s| (s, similarity::score(text, s)))
            .fold(None, |best, (s, score)| match best {
                Some((_, b)) if b >= score => best,
                _ => Some((s, score)),
            })
    }

    /// Best catalog entry if it reaches the threshold, otherwise the fallback label.
    pub fn classify_subject(&self, text: &str, catalog: &[Subject]) -> Subject {
        match self.best_match(text, catalog) {
            Some((subject, score)) if score >= self.threshold => subject.clone(),
            best => {
                log::debug!(
                    "subject: no catalog entry above {:.2} (best {:?}), using {}",
                    self.threshold,
                    best,
                    self.fallback
                );
                self.fallback.clone()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<Subject> {
        vec![
            "Atraso".to_string(),
            "Reembolso".to_string(),
            "Segunda via de boleto".to_string(),
        ]
    }

    #[test]
    fn verbatim_entry_scores_one() {
        let c = SubjectClassifier::default();
        let catalog = catalog();
        let (subject, score) = c.best_match("Reembolso", &catalog).unwrap();
        assert_eq!(subject, "Reembolso");
        assert_eq!(score, 1.0);
        assert_eq!(c.classify_subject("Reembolso", &catalog), "Reembolso");
    }

    #[test]
    fn unrelated_text_falls_back() {
        let c = SubjectClassifier::default();
        assert_eq!(c.classify_subject("xyz", &catalog()), "Outro");
        assert_eq!(c.classify_subject("qualquer coisa", &[]), "Outro");
    }

    #[test]
    fn close_word_in_conversation_is_enough() {
        let c = SubjectClassifier::default();
        assert_eq!(
            c.classify_subject("1 - Meu pedido está atrasado", &catalog()),
            "Atraso"
        );
    }

    #[test]
    fn threshold_and_label_are_configurable() {
        let c = SubjectClassifier::new(0.95, "Other");
        assert_eq!(c.classify_subject("1 - Meu pedido está atrasado", &catalog()), "Other");
    }
}
