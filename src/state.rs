use serde::{Deserialize, Serialize};

/// State that can be threaded through a [`crate::Workflow`].
///
/// Steps never mutate the state directly. They return an `Update`, and the
/// runner folds it in with [`GraphState::apply`] before the next step or
/// router sees the state.
pub trait GraphState: Send + 'static {
    type Update;

    fn apply(&mut self, update: Self::Update);
}

/// A piece of supporting text handed to the generator and the graders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// The record threaded through one answering run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RagState {
    question: String,
    pub documents: Vec<Document>,
    pub needs_web_search: bool,
    pub generation: String,
    /// How many times Generate has run in this run.
    pub generations: u32,
}

impl RagState {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Self::default()
        }
    }

    /// The question is fixed at construction; no [`StateUpdate`] can touch it.
    pub fn question(&self) -> &str {
        &self.question
    }
}

/// How a step wants the document list changed.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentsUpdate {
    Replace(Vec<Document>),
    Append(Vec<Document>),
}

/// Partial update returned by a step. `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    pub documents: Option<DocumentsUpdate>,
    pub needs_web_search: Option<bool>,
    pub generation: Option<String>,
}

impl StateUpdate {
    pub fn replace_documents(mut self, documents: Vec<Document>) -> Self {
        self.documents = Some(DocumentsUpdate::Replace(documents));
        self
    }

    pub fn append_documents(mut self, documents: Vec<Document>) -> Self {
        self.documents = Some(DocumentsUpdate::Append(documents));
        self
    }

    pub fn needs_web_search(mut self, value: bool) -> Self {
        self.needs_web_search = Some(value);
        self
    }

    pub fn generation(mut self, generation: impl Into<String>) -> Self {
        self.generation = Some(generation.into());
        self
    }
}

impl GraphState for RagState {
    type Update = StateUpdate;

    fn apply(&mut self, update: StateUpdate) {
        match update.documents {
            Some(DocumentsUpdate::Replace(docs)) => self.documents = docs,
            Some(DocumentsUpdate::Append(docs)) => self.documents.extend(docs),
            None => {}
        }
        if let Some(flag) = update.needs_web_search {
            self.needs_web_search = flag;
        }
        if let Some(generation) = update.generation {
            self.generation = generation;
            self.generations += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(items: &[&str]) -> Vec<Document> {
        items.iter().map(|s| Document::new(*s)).collect()
    }

    #[test]
    fn new_state_only_has_question() {
        let state = RagState::new("agent memory");
        assert_eq!(state.question(), "agent memory");
        assert!(state.documents.is_empty());
        assert!(!state.needs_web_search);
        assert!(state.generation.is_empty());
        assert_eq!(state.generations, 0);
    }

    #[test]
    fn replace_discards_previous_documents() {
        let mut state = RagState::new("q");
        state.documents = docs(&["old"]);
        state.apply(StateUpdate::default().replace_documents(docs(&["a", "b"])));
        assert_eq!(state.documents, docs(&["a", "b"]));
    }

    #[test]
    fn append_keeps_previous_documents() {
        let mut state = RagState::new("q");
        state.documents = docs(&["old"]);
        state.apply(StateUpdate::default().append_documents(docs(&["web"])));
        assert_eq!(state.documents, docs(&["old", "web"]));
    }

    #[test]
    fn generation_overwrites_and_counts() {
        let mut state = RagState::new("q");
        state.apply(StateUpdate::default().generation("first"));
        state.apply(StateUpdate::default().generation("second"));
        assert_eq!(state.generation, "second");
        assert_eq!(state.generations, 2);
    }

    #[test]
    fn empty_update_changes_nothing() {
        let mut state = RagState::new("q");
        state.needs_web_search = true;
        let before = state.clone();
        state.apply(StateUpdate::default());
        assert_eq!(state, before);
    }

    #[test]
    fn document_source_is_omitted_when_absent() {
        let json = serde_json::to_string(&Document::new("text")).unwrap();
        assert_eq!(json, r#"{"content":"text"}"#);

        let doc: Document =
            serde_json::from_str(r#"{"content":"x","source":"https://a.b"}"#).unwrap();
        assert_eq!(doc, Document::new("x").with_source("https://a.b"));
    }
}
