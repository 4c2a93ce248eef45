//! OpenAI-compatible chat client backing the generator and every classifier.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use ureq::Agent;

use crate::collaborators::{
    AnswerGrader, DataSource, Generator, HallucinationGrader, QuestionRouter, RelevanceGrader,
};
use crate::state::Document;
use crate::step::StepError;
use crate::tools::{http, parse};

const ROUTER_SYSTEM: &str = "You route a user question to a vectorstore or to web search. \
The vectorstore contains documents about agents, prompt engineering, and LLM hallucination. \
Use the vectorstore for questions on these topics; otherwise use web search. \
Reply with JSON: {\"datasource\": \"vectorstore\"} or {\"datasource\": \"websearch\"}.";

const RELEVANCE_SYSTEM: &str = "You are a grader assessing relevance of a retrieved document to a user question. \
If the document contains keywords or meaning related to the question, grade it as relevant. \
Reply with JSON: {\"binary_score\": \"yes\"} or {\"binary_score\": \"no\"}.";

const HALLUCINATION_SYSTEM: &str = "You are a grader assessing whether an LLM generation is grounded in / supported by a set of retrieved facts. \
Give a binary score 'yes' or 'no'. 'Yes' means that the answer is grounded in / supported by the set of facts. \
Reply with JSON: {\"binary_score\": \"yes\"} or {\"binary_score\": \"no\"}.";

const ANSWER_SYSTEM: &str = "You are a grader assessing whether an answer addresses / resolves a question. \
Give a binary score 'yes' or 'no'. 'Yes' means that the answer resolves the question. \
Reply with JSON: {\"binary_score\": \"yes\"} or {\"binary_score\": \"no\"}.";

const GENERATE_SYSTEM: &str = "You are an assistant for question-answering tasks. \
Use the following pieces of retrieved context to answer the question. \
If you don't know the answer, just say that you don't know. \
Use three sentences maximum and keep the answer concise.";

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Join document contents the way they are shown to the model.
pub fn format_documents(documents: &[Document]) -> String {
    documents
        .iter()
        .map(|d| d.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub struct ChatClient {
    agent: Agent,
    base_url: String,
    api_key: String,
    model: String,
}

impl ChatClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            agent: http::agent(timeout),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// One system + user exchange at temperature 0. With `json` set the
    /// model is asked for a JSON object.
    pub fn complete(&self, system: &str, user: &str, json: bool) -> Result<String, StepError> {
        let request = ChatRequest {
            model: &self.model,
            temperature: 0.0,
            messages: vec![
                Message {
                    role: "system",
                    content: system,
                },
                Message {
                    role: "user",
                    content: user,
                },
            ],
            response_format: json.then_some(ResponseFormat { kind: "json_object" }),
        };
        let url = format!("{}/chat/completions", self.base_url);
        let response: ChatResponse =
            http::post_json(&self.agent, &url, Some(&self.api_key), &request)?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| StepError::invalid("chat completion had no content"))?;
        debug!(model = %self.model, chars = content.len(), "chat completion");
        Ok(content)
    }

    fn verdict(&self, system: &str, user: &str) -> Result<bool, StepError> {
        parse::binary_score(&self.complete(system, user, true)?)
    }
}

impl QuestionRouter for ChatClient {
    fn route_question(&self, question: &str) -> Result<DataSource, StepError> {
        parse::datasource(&self.complete(ROUTER_SYSTEM, question, true)?)
    }
}

impl RelevanceGrader for ChatClient {
    fn is_relevant(&self, question: &str, document: &str) -> Result<bool, StepError> {
        self.verdict(
            RELEVANCE_SYSTEM,
            &format!("Retrieved document:\n\n{document}\n\nUser question: {question}"),
        )
    }
}

impl HallucinationGrader for ChatClient {
    fn is_grounded(&self, documents: &[Document], generation: &str) -> Result<bool, StepError> {
        self.verdict(
            HALLUCINATION_SYSTEM,
            &format!(
                "Set of facts:\n\n{}\n\nLLM generation: {generation}",
                format_documents(documents)
            ),
        )
    }
}

impl AnswerGrader for ChatClient {
    fn addresses_question(&self, question: &str, generation: &str) -> Result<bool, StepError> {
        self.verdict(
            ANSWER_SYSTEM,
            &format!("User question:\n\n{question}\n\nLLM generation: {generation}"),
        )
    }
}

impl Generator for ChatClient {
    fn generate(&self, question: &str, context: &[Document]) -> Result<String, StepError> {
        let user = format!(
            "Question: {question}\n\nContext: {}\n\nAnswer:",
            format_documents(context)
        );
        Ok(self.complete(GENERATE_SYSTEM, &user, false)?.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = ChatRequest {
            model: "m",
            temperature: 0.0,
            messages: vec![Message {
                role: "user",
                content: "hi",
            }],
            response_format: Some(ResponseFormat { kind: "json_object" }),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["messages"][0]["role"], "user");

        let plain = ChatRequest {
            response_format: None,
            ..request
        };
        assert!(serde_json::to_value(&plain).unwrap().get("response_format").is_none());
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"{\"binary_score\":\"yes\"}"}}]}"#;
        let response: ChatResponse = serde_json::from_str(raw).unwrap();
        let content = response.choices[0].message.content.as_deref().unwrap();
        assert!(parse::binary_score(content).unwrap());
    }

    #[test]
    fn test_format_documents() {
        let docs = vec![Document::new("one"), Document::new("two")];
        assert_eq!(format_documents(&docs), "one\n\ntwo");
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = ChatClient::new("http://localhost:1/v1/", "k", "m", Duration::from_secs(1));
        assert_eq!(client.base_url, "http://localhost:1/v1");
        assert_eq!(client.model, "m");
    }

    #[test]
    fn test_unreachable_server_is_unavailable() {
        let client = ChatClient::new("http://localhost:1/v1", "k", "m", Duration::from_secs(2));
        let err = client.generate("q", &[Document::new("ctx")]).unwrap_err();
        assert!(err.is_transient());
    }
}
