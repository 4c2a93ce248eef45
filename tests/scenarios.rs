use adaptive_rag::{
    AdaptiveRag, Answer, AnswerGrader, AnswerStatus, Collaborators, DataSource, Document, Generator,
    HallucinationGrader, QuestionRouter, RagState, RelevanceGrader, Retriever, Runner, SearchHit,
    StepError, WebSearch,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Scripted collaborators. Every call is appended to `calls`.
struct Stub {
    route: DataSource,
    retrieved: Result<Vec<Document>, String>,
    relevant: Box<dyn Fn(&str) -> bool + Send + Sync>,
    answers: Mutex<VecDeque<String>>,
    grounded: Box<dyn Fn(&[Document], &str) -> bool + Send + Sync>,
    adequate: Box<dyn Fn(&str) -> bool + Send + Sync>,
    hits: Vec<SearchHit>,
    calls: Mutex<Vec<String>>,
}

impl Stub {
    fn new(route: DataSource) -> Self {
        Self {
            route,
            retrieved: Ok(Vec::new()),
            relevant: Box::new(|_| true),
            answers: Mutex::new(VecDeque::from(vec!["grounded answer".to_string()])),
            grounded: Box::new(|_, generation| generation.starts_with("grounded")),
            adequate: Box::new(|_| true),
            hits: vec![SearchHit::new("web result")],
            calls: Mutex::new(Vec::new()),
        }
    }

    fn retrieving(mut self, docs: &[&str]) -> Self {
        self.retrieved = Ok(docs.iter().map(|d| Document::new(*d)).collect());
        self
    }

    fn answering(self, answers: &[&str]) -> Self {
        *self.answers.lock().unwrap() = answers.iter().map(|a| a.to_string()).collect();
        self
    }

    fn log(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }
}

impl QuestionRouter for Stub {
    fn route_question(&self, _question: &str) -> Result<DataSource, StepError> {
        self.log("route");
        Ok(self.route)
    }
}

impl Retriever for Stub {
    fn retrieve(&self, _question: &str) -> Result<Vec<Document>, StepError> {
        self.log("retrieve");
        self.retrieved.clone().map_err(StepError::Unavailable)
    }
}

impl RelevanceGrader for Stub {
    fn is_relevant(&self, _question: &str, document: &str) -> Result<bool, StepError> {
        self.log(format!("relevance:{document}"));
        Ok((self.relevant)(document))
    }
}

impl Generator for Stub {
    fn generate(&self, _question: &str, context: &[Document]) -> Result<String, StepError> {
        self.log(format!("generate:{}", context.len()));
        let mut answers = self.answers.lock().unwrap();
        // the last scripted answer repeats
        let next = if answers.len() > 1 {
            answers.pop_front()
        } else {
            answers.front().cloned()
        };
        next.ok_or_else(|| StepError::invalid("no scripted answer"))
    }
}

impl HallucinationGrader for Stub {
    fn is_grounded(&self, documents: &[Document], generation: &str) -> Result<bool, StepError> {
        self.log("hallucination");
        Ok((self.grounded)(documents, generation))
    }
}

impl AnswerGrader for Stub {
    fn addresses_question(&self, _question: &str, generation: &str) -> Result<bool, StepError> {
        self.log("answer");
        Ok((self.adequate)(generation))
    }
}

impl WebSearch for Stub {
    fn search(&self, _query: &str) -> Result<Vec<SearchHit>, StepError> {
        self.log("websearch");
        Ok(self.hits.clone())
    }
}

fn wire(stub: &Arc<Stub>) -> Collaborators {
    Collaborators {
        router: stub.clone(),
        retriever: stub.clone(),
        relevance: stub.clone(),
        generator: stub.clone(),
        hallucination: stub.clone(),
        answer: stub.clone(),
        web_search: stub.clone(),
    }
}

/// Run `rag` and collect the visited nodes in order.
fn run(rag: AdaptiveRag, question: &str) -> (Result<Answer, StepError>, Vec<&'static str>) {
    let mut path = Vec::new();
    let result = rag.answer_with_progress(question, |e| path.push(e.node));
    (result, path)
}

#[test]
fn scenario_a_vectorstore_all_relevant() {
    let stub = Arc::new(
        Stub::new(DataSource::Vectorstore)
            .retrieving(&["memory 1", "memory 2", "memory 3", "memory 4"]),
    );
    let (answer, path) = run(AdaptiveRag::new(wire(&stub)), "agent memory");
    let answer = answer.unwrap();

    assert_eq!(path, vec!["retrieve", "grade_documents", "generate"]);
    assert_eq!(answer.status, AnswerStatus::Useful);
    assert!(!answer.generation.is_empty());
    assert_eq!(answer.documents.len(), 4);
    assert_eq!(stub.count("relevance:"), 4);
    assert_eq!(stub.count("websearch"), 0);
}

#[test]
fn scenario_b_websearch_route() {
    let stub = Arc::new(Stub::new(DataSource::Websearch));
    let (answer, path) = run(AdaptiveRag::new(wire(&stub)), "how to make pizza");
    let answer = answer.unwrap();

    assert_eq!(path, vec!["websearch", "generate"]);
    assert_eq!(answer.status, AnswerStatus::Useful);
    assert_eq!(answer.documents.len(), 1);
    assert_eq!(answer.documents[0].content, "web result");
    assert_eq!(stub.count("retrieve"), 0);
}

#[test]
fn scenario_c_ungrounded_answer_is_regenerated() {
    let stub = Arc::new(
        Stub::new(DataSource::Vectorstore)
            .retrieving(&["memory"])
            .answering(&["made up", "grounded answer"]),
    );
    let (answer, path) = run(AdaptiveRag::new(wire(&stub)), "agent memory");
    let answer = answer.unwrap();

    assert_eq!(path, vec!["retrieve", "grade_documents", "generate", "generate"]);
    assert_eq!(answer.generation, "grounded answer");
    assert_eq!(answer.generations, 2);
    assert_eq!(answer.status, AnswerStatus::Useful);
    // same documents on the retry; answer grader only sees the grounded one
    assert_eq!(stub.count("generate:1"), 2);
    assert_eq!(stub.count("answer"), 1);
}

#[test]
fn vectorstore_route_starts_with_retrieve() {
    for docs in [vec![], vec!["a"], vec!["a", "b", "c"]] {
        let stub = Arc::new(Stub::new(DataSource::Vectorstore).retrieving(&docs));
        let (_, path) = run(AdaptiveRag::new(wire(&stub)), "q");
        assert_eq!(path.first(), Some(&"retrieve"));
    }
}

#[test]
fn irrelevant_document_adds_web_search() {
    let mut stub = Stub::new(DataSource::Vectorstore).retrieving(&["memory", "pizza"]);
    stub.relevant = Box::new(|doc| doc != "pizza");
    let stub = Arc::new(stub);

    let (answer, path) = run(AdaptiveRag::new(wire(&stub)), "agent memory");
    let answer = answer.unwrap();

    assert_eq!(path, vec!["retrieve", "grade_documents", "websearch", "generate"]);
    let contents: Vec<_> = answer.documents.iter().map(|d| d.content.as_str()).collect();
    assert_eq!(contents, vec!["memory", "web result"]);
}

#[test]
fn empty_retrieval_falls_back_to_web_search() {
    let stub = Arc::new(Stub::new(DataSource::Vectorstore));
    let (answer, path) = run(AdaptiveRag::new(wire(&stub)), "agent memory");

    assert_eq!(path, vec!["retrieve", "grade_documents", "websearch", "generate"]);
    assert_eq!(answer.unwrap().documents.len(), 1);
}

#[test]
fn inadequate_answer_searches_again_and_keeps_documents() {
    let mut stub = Stub::new(DataSource::Vectorstore)
        .retrieving(&["memory"])
        .answering(&["grounded but vague", "grounded and specific"]);
    stub.adequate = Box::new(|g| g.ends_with("specific"));
    let stub = Arc::new(stub);

    let (answer, path) = run(AdaptiveRag::new(wire(&stub)), "agent memory");
    let answer = answer.unwrap();

    assert_eq!(
        path,
        vec!["retrieve", "grade_documents", "generate", "websearch", "generate"]
    );
    assert_eq!(answer.documents.len(), 2);
    assert_eq!(answer.documents[0].content, "memory");
    assert_eq!(answer.status, AnswerStatus::Useful);
}

#[test]
fn useful_answer_passes_both_graders_on_final_pair() {
    let stub = Arc::new(
        Stub::new(DataSource::Vectorstore)
            .retrieving(&["memory"])
            .answering(&["made up", "grounded answer"]),
    );
    let (answer, _) = run(AdaptiveRag::new(wire(&stub)), "agent memory");
    let answer = answer.unwrap();

    assert_eq!(answer.status, AnswerStatus::Useful);
    assert!(stub.is_grounded(&answer.documents, &answer.generation).unwrap());
    assert!(stub.addresses_question(&answer.question, &answer.generation).unwrap());
}

#[test]
fn generation_budget_ends_in_best_effort() {
    let stub = Arc::new(
        Stub::new(DataSource::Vectorstore)
            .retrieving(&["memory"])
            .answering(&["made up"]),
    );
    let rag = AdaptiveRag::new(wire(&stub)).with_max_generations(Some(2));
    let (answer, path) = run(rag, "agent memory");
    let answer = answer.unwrap();

    assert_eq!(path, vec!["retrieve", "grade_documents", "generate", "generate"]);
    assert_eq!(answer.status, AnswerStatus::BestEffort);
    assert_eq!(answer.generations, 2);
    assert_eq!(answer.generation, "made up");
}

#[test]
fn unbounded_generation_hits_step_limit() {
    let stub = Arc::new(
        Stub::new(DataSource::Vectorstore)
            .retrieving(&["memory"])
            .answering(&["made up"]),
    );
    let rag = AdaptiveRag::new(wire(&stub))
        .with_max_generations(None)
        .with_max_steps(10);
    let (answer, path) = run(rag, "agent memory");

    assert!(matches!(answer, Err(StepError::StepLimit { max_steps: 10, .. })));
    assert_eq!(path.len(), 10);
}

#[test]
fn collaborator_failure_halts_run() {
    let mut stub = Stub::new(DataSource::Vectorstore);
    stub.retrieved = Err("vector index offline".to_string());
    let stub = Arc::new(stub);

    let (answer, path) = run(AdaptiveRag::new(wire(&stub)), "agent memory");

    let err = answer.unwrap_err();
    assert!(matches!(&err, StepError::Unavailable(msg) if msg == "vector index offline"));
    assert!(err.is_transient());
    assert!(path.is_empty());
    assert_eq!(stub.count("generate"), 0);
}

#[test]
fn failing_generator_reports_error_once() {
    let stub = Arc::new(
        Stub::new(DataSource::Vectorstore)
            .retrieving(&["memory"])
            .answering(&[]),
    );
    let errors = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&errors);
    let workflow = AdaptiveRag::new(wire(&stub)).workflow().unwrap();
    let mut runner = Runner::new(workflow)
        .on_error(move |e| seen.lock().unwrap().push((e.node.to_string(), e.step_number)));

    let err = runner.run(RagState::new("agent memory")).unwrap_err();

    assert!(matches!(err, StepError::Invalid(_)));
    assert_eq!(*errors.lock().unwrap(), vec![("generate".to_string(), 3)]);
    assert_eq!(stub.count("hallucination"), 0);
}

#[test]
fn independent_runs_share_collaborators_across_threads() {
    let stub = Arc::new(Stub::new(DataSource::Vectorstore).retrieving(&["memory"]));
    let rag = Arc::new(AdaptiveRag::new(wire(&stub)));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let rag = Arc::clone(&rag);
            std::thread::spawn(move || rag.answer(&format!("question {i}")))
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let answer = handle.join().unwrap().unwrap();
        assert_eq!(answer.question, format!("question {i}"));
        assert_eq!(answer.status, AnswerStatus::Useful);
    }
    assert_eq!(stub.count("retrieve"), 4);
}
