//! Ticket pipeline: aggregate → rank → build request → classify → parse → review rows.
//!
//! Tickets are processed one at a time. Consecutive classification calls are separated by the
//! configured throttle interval. A classification failure ends the run; records already produced
//! have been handed to the caller's callback by then. Cancellation is checked before each ticket
//! and during the throttle wait, and returns the records produced so far.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::aggregate::ConversationAggregator;
use crate::classify::ClassificationClient;
use crate::config::{Config, MediaConfig};
use crate::filter::{FilterError, MessageFilter};
use crate::llm::{ChatBackend, LlmError};
use crate::model::{format_media_links, CannedResponse, Conversation, RawMessage, ReviewRecord, Subject};
use crate::subject::SubjectClassifier;
use crate::throttle::IntervalGate;
use crate::{parse, prompt, rank};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("classifying ticket {ticket_id}: {source}")]
    Classification {
        ticket_id: String,
        #[source]
        source: LlmError,
    },
}

pub struct Pipeline<B> {
    filter: MessageFilter,
    media: MediaConfig,
    classifier: SubjectClassifier,
    client: ClassificationClient<B>,
    top_responses: usize,
    throttle: Duration,
}

impl<B: ChatBackend> Pipeline<B> {
    /// Build from config; fails only if a boilerplate pattern does not compile.
    pub fn new(config: &Config, backend: B) -> Result<Self, FilterError> {
        Ok(Self {
            filter: MessageFilter::new(&config.filter)?,
            media: config.media.clone(),
            classifier: SubjectClassifier::new(
                config.pipeline.subject_threshold,
                config.pipeline.fallback_subject.clone(),
            ),
            client: ClassificationClient::new(backend),
            top_responses: config.pipeline.top_responses,
            throttle: config.pipeline.throttle_interval(),
        })
    }

    pub fn client(&self) -> &ClassificationClient<B> {
        &self.client
    }

    /// Aggregation step only; no service calls.
    pub fn conversations(&self, rows: &[RawMessage]) -> Vec<Conversation> {
        ConversationAggregator::new(&self.filter, &self.media).aggregate(rows)
    }

    /// Run the whole batch without cancellation or per-record callback.
    pub async fn run(
        &self,
        rows: &[RawMessage],
        subjects: &[Subject],
        responses: &[CannedResponse],
    ) -> Result<Vec<ReviewRecord>, PipelineError> {
        self.run_with(rows, subjects, responses, &CancellationToken::new(), &mut |_: &ReviewRecord| {})
            .await
    }

    /// Run the batch, calling `on_record` as each row is produced.
    pub async fn run_with(
        &self,
        rows: &[RawMessage],
        subjects: &[Subject],
        responses: &[CannedResponse],
        cancel: &CancellationToken,
        on_record: &mut (dyn FnMut(&ReviewRecord) + Send),
    ) -> Result<Vec<ReviewRecord>, PipelineError> {
        let conversations = self.conversations(rows);
        log::info!(
            "pipeline: {} ticket(s) to classify from {} row(s)",
            conversations.len(),
            rows.len()
        );

        let mut gate = IntervalGate::new(self.throttle);
        let mut records = Vec::with_capacity(conversations.len());
        for (index, conversation) in conversations.iter().enumerate() {
            let cancelled = tokio::select! {
                biased;
                _ = cancel.cancelled() => true,
                _ = gate.wait() => false,
            };
            if cancelled {
                log::info!(
                    "pipeline: cancelled after {} of {} ticket(s)",
                    records.len(),
                    conversations.len()
                );
                break;
            }

            log::info!(
                "pipeline: ticket {} ({}/{})",
                conversation.ticket_id,
                index + 1,
                conversations.len()
            );
            let text = conversation.text();
            let ranked = rank::rank(&text, responses, self.top_responses);
            let request = prompt::build(conversation, subjects, &ranked);
            let raw = self.client.classify(&request).await.map_err(|source| {
                PipelineError::Classification {
                    ticket_id: conversation.ticket_id.clone(),
                    source,
                }
            })?;
            gate.mark();

            let result = parse::parse(&raw, &text, subjects, &self.classifier);
            let record = ReviewRecord {
                id: index + 1,
                ticket_id: conversation.ticket_id.clone(),
                sender_name: conversation.sender_name.clone(),
                sender_handle: conversation.sender_handle.clone(),
                conversation: text,
                media_links: format_media_links(&conversation.media),
                subject: result.subject,
                sentiment: result.sentiment,
                suggested_reply: result.suggested_reply,
                approved: None,
            };
            on_record(&record);
            records.push(record);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ClassificationRequest;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Answers every call with the same text and records when each call happened.
    struct Fixed {
        reply: String,
        calls: Mutex<Vec<Instant>>,
    }

    impl Fixed {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatBackend for Fixed {
        async fn complete(&self, _request: &ClassificationRequest) -> Result<String, LlmError> {
            self.calls.lock().unwrap().push(Instant::now());
            Ok(self.reply.clone())
        }
    }

    fn rows(n: usize) -> Vec<RawMessage> {
        (0..n)
            .map(|i| RawMessage {
                ticket_id: format!("T{}", i),
                text: Some(format!("mensagem {}", i)),
                ..RawMessage::default()
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn calls_are_spaced_by_throttle_interval() {
        let pipeline = Pipeline::new(&Config::default(), Fixed::new("{}")).unwrap();
        let records = pipeline.run(&rows(3), &[], &[]).await.unwrap();
        assert_eq!(records.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2, 3]);
        let calls = pipeline.client().backend().calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 3);
        for pair in calls.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(7));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_keeps_records_already_produced() {
        let pipeline = Pipeline::new(&Config::default(), Fixed::new("{}")).unwrap();
        let cancel = CancellationToken::new();
        let mut seen = Vec::new();
        let records = pipeline
            .run_with(&rows(3), &[], &[], &cancel, &mut |r: &ReviewRecord| {
                seen.push(r.id);
                cancel.cancel();
            })
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(seen, vec![1]);
    }

    #[tokio::test]
    async fn records_carry_sender_media_and_empty_approval() {
        let mut config = Config::default();
        config.pipeline.throttle_secs = 0.0;
        let pipeline = Pipeline::new(
            &config,
            Fixed::new(r#"{"assunto":"Troca","sentiment":"positivo","response":"Olá!"}"#),
        )
        .unwrap();
        let input = vec![RawMessage {
            ticket_id: "T9".into(),
            sender_name: "Ana".into(),
            sender_handle: "@ana".into(),
            text: Some("quero trocar".into()),
            media_reference: Some("https://cdn.example.com/p.jpg".into()),
        }];
        let records = pipeline.run(&input, &["Troca".to_string()], &[]).await.unwrap();
        let r = &records[0];
        assert_eq!(r.sender_name, "Ana");
        assert_eq!(r.sender_handle, "@ana");
        assert_eq!(r.conversation, "1 - quero trocar");
        assert_eq!(r.media_links, "1. https://cdn.example.com/p.jpg");
        assert_eq!(r.subject, "Troca");
        assert_eq!(r.suggested_reply, "Olá!");
        assert_eq!(r.approved, None);
    }
}
