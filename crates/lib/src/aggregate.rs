//! Group raw ticket rows into conversations.
//!
//! Tickets keep first-seen order. Within a ticket, surviving lines are numbered from 1 in input
//! order and media references are kept in encounter order, subject to the [`MediaConfig`] policy.

use std::collections::HashMap;

use crate::config::MediaConfig;
use crate::filter::MessageFilter;
use crate::model::{Conversation, MessageLine, RawMessage};

/// Builds conversations from raw rows using a boilerplate filter and a media policy.
pub struct ConversationAggregator<'a> {
    filter: &'a MessageFilter,
    media: &'a MediaConfig,
}

impl<'a> ConversationAggregator<'a> {
    pub fn new(filter: &'a MessageFilter, media: &'a MediaConfig) -> Self {
        Self { filter, media }
    }

    /// Group rows by ticket id. Tickets with neither surviving text nor allowed media are dropped.
    pub fn aggregate(&self, rows: &[RawMessage]) -> Vec<Conversation> {
        let mut order: Vec<&str> = Vec::new();
        let mut groups: HashMap<&str, Vec<&RawMessage>> = HashMap::new();
        for row in rows {
            let id = row.ticket_id.as_str();
            groups
                .entry(id)
                .or_insert_with(|| {
                    order.push(id);
                    Vec::new()
                })
                .push(row);
        }

        order
            .into_iter()
            .filter_map(|id| {
                let group = groups.remove(id)?;
                let conv = self.build(id, &group);
                if conv.is_none() {
                    log::debug!("aggregate: dropping ticket {} (no text or media)", id);
                }
                conv
            })
            .collect()
    }

    fn build(&self, ticket_id: &str, group: &[&RawMessage]) -> Option<Conversation> {
        let first = group.first()?;
        let mut lines = Vec::new();
        let mut media = Vec::new();

        for (index, row) in group.iter().enumerate() {
            if let Some(text) = row.text.as_deref() {
                if !self.filter.is_boilerplate(text) {
                    lines.push(MessageLine {
                        ordinal: Some(lines.len() + 1),
                        source_index: Some(index),
                        text: text.trim().to_string(),
                    });
                }
            }
            if let Some(reference) = row.media_reference.as_deref() {
                if self.media.allows(reference) {
                    media.push(reference.trim().to_string());
                } else if !reference.trim().is_empty() {
                    log::debug!("aggregate: ticket {} media not allowed: {}", ticket_id, reference);
                }
            }
        }

        if lines.is_empty() {
            if media.is_empty() {
                return None;
            }
            lines.push(MessageLine::placeholder(self.media.placeholder.clone()));
        }

        Some(Conversation {
            ticket_id: ticket_id.to_string(),
            lines,
            media,
            sender_name: first.sender_name.clone(),
            sender_handle: first.sender_handle.clone(),
        })
    }
}
