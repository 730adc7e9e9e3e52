//! Build the classification request for one conversation.
//!
//! The system turn fixes persona and output contract. The user turn carries the greeting, the
//! literal subject catalog, the ranked canned responses, the filtered conversation and the rules.
//! Media references travel as separate image parts of the same user turn.

use std::fmt::Write;

use crate::llm::ClassificationRequest;
use crate::model::{CannedResponse, Conversation, Sentiment, Subject};

const SYSTEM_PROMPT: &str = "Você é um assistente de atendimento ao cliente. \
Você classifica conversas de suporte e sugere uma resposta usando somente o material aprovado \
que recebe. Responda sempre com um único objeto JSON com exatamente as chaves \
\"assunto\", \"sentiment\" e \"response\", sem nenhum texto fora do JSON.";

/// Greeting the suggested reply must open with.
pub fn greeting(conversation: &Conversation) -> String {
    match conversation.first_name() {
        Some(name) => format!("Olá, {}!", name),
        None => "Olá!".to_string(),
    }
}

pub fn build(
    conversation: &Conversation,
    subjects: &[Subject],
    ranked: &[CannedResponse],
) -> ClassificationRequest {
    ClassificationRequest {
        system: SYSTEM_PROMPT.to_string(),
        text: user_text(conversation, subjects, ranked),
        media: conversation.media.clone(),
        media_note: conversation.has_media().then(|| {
            format!(
                "O cliente também enviou {} imagem(ns), anexada(s) a esta mensagem.",
                conversation.media.len()
            )
        }),
    }
}

fn user_text(conversation: &Conversation, subjects: &[Subject], ranked: &[CannedResponse]) -> String {
    let sentiments = Sentiment::ALL
        .iter()
        .map(|s| format!("\"{}\"", s))
        .collect::<Vec<_>>()
        .join(", ");

    // Writing to a String cannot fail.
    let mut out = String::new();
    let _ = writeln!(
        out,
        "A resposta sugerida deve começar com a saudação \"{}\".\n",
        greeting(conversation)
    );

    out.push_str("Assuntos permitidos:\n");
    for subject in subjects {
        let _ = writeln!(out, "- {}", subject);
    }

    out.push_str("\nRespostas pré-aprovadas:\n");
    for response in ranked {
        let _ = writeln!(out, "### {}\n{}\n", response.title, response.content);
    }

    let _ = writeln!(out, "\nConversa do cliente:\n{}\n", conversation.text());

    out.push_str("Regras:\n");
    out.push_str(
        "1. \"assunto\" deve ser copiado literalmente, sem alterações, da lista de assuntos permitidos.\n",
    );
    out.push_str(
        "2. \"response\" deve ter pelo menos 90% de conteúdo literal das respostas pré-aprovadas, \
com no máximo pequenos ajustes ao contexto da conversa.\n",
    );
    let _ = writeln!(
        out,
        "3. \"sentiment\" deve ser exatamente um destes valores: {}.",
        sentiments
    );
    out.push_str(
        "\nResponda apenas com um único objeto JSON com exatamente as chaves \"assunto\", \"sentiment\" e \"response\".",
    );
    out
}
