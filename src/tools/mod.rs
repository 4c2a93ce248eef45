pub mod corpus;
pub mod http;
pub mod llm;
pub mod memory;
pub mod parse;
pub mod tavily;

pub use corpus::{DEFAULT_CHUNK_CHARS, chunk, load_dir};
pub use llm::{ChatClient, format_documents};
pub use memory::{DEFAULT_TOP_K, MemoryRetriever};
pub use parse::{binary_score, datasource, extract_json, strip_code_fences};
pub use tavily::{TAVILY_ENDPOINT, TavilySearch};
