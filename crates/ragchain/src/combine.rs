//! Stuff-documents step: all retrieved documents go into one prompt.

use async_trait::async_trait;
use ragchain_chat::{ChatMessage, ChatModel};
use ragchain_core::{Document, Error, Result};
use tracing::debug;

use crate::prompt::PromptTemplate;

/// Slot in the main prompt that receives the formatted documents.
pub const DOCUMENT_VARIABLE: &str = "context";
/// Slot in the main prompt that receives the question.
pub const INPUT_VARIABLE: &str = "input";
pub const DEFAULT_DOCUMENT_SEPARATOR: &str = "\n\n";
pub const DEFAULT_DOCUMENT_PROMPT: &str = "{page_content}";

/// Stage two of a RAG chain: documents + question in, answer out.
#[async_trait]
pub trait CombineDocuments: Send + Sync {
    async fn combine(&self, documents: &[Document], input: &str) -> Result<String>;
}

/// Formats every document, joins them into the `context` slot and asks
/// the model once.
pub struct StuffDocumentsChain<L> {
    llm: L,
    prompt: PromptTemplate,
    document_prompt: PromptTemplate,
    document_separator: String,
}

impl<L: ChatModel> StuffDocumentsChain<L> {
    /// Fails if `prompt` has no `context` slot.
    pub fn new(llm: L, prompt: PromptTemplate) -> Result<Self> {
        if !prompt.input_variables().iter().any(|v| v == DOCUMENT_VARIABLE) {
            return Err(Error::Prompt(format!(
                "prompt must contain a {{{}}} slot, found {:?}",
                DOCUMENT_VARIABLE,
                prompt.input_variables()
            )));
        }
        Ok(Self {
            llm,
            prompt,
            document_prompt: PromptTemplate::from_template(DEFAULT_DOCUMENT_PROMPT)?,
            document_separator: DEFAULT_DOCUMENT_SEPARATOR.to_string(),
        })
    }

    /// Per-document template. Slots resolve to `page_content` or a metadata key.
    pub fn with_document_prompt(mut self, document_prompt: PromptTemplate) -> Self {
        self.document_prompt = document_prompt;
        self
    }

    pub fn with_document_separator(mut self, separator: impl Into<String>) -> Self {
        self.document_separator = separator.into();
        self
    }

    pub fn llm(&self) -> &L {
        &self.llm
    }

    pub fn prompt(&self) -> &PromptTemplate {
        &self.prompt
    }

    /// Render one document with the document prompt.
    pub fn format_document(&self, document: &Document) -> Result<String> {
        let mut owned: Vec<(String, String)> = Vec::new();
        for var in self.document_prompt.input_variables() {
            let value = if var == "page_content" {
                document.page_content.clone()
            } else if let Some(text) = document.metadata_str(var) {
                text.to_string()
            } else {
                match document.metadata.get(var) {
                    Some(other) => other.to_string(),
                    None => {
                        return Err(Error::Prompt(format!(
                            "document is missing metadata '{}' required by the document prompt",
                            var
                        )))
                    }
                }
            };
            owned.push((var.clone(), value));
        }
        let values: Vec<(&str, &str)> = owned
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        self.document_prompt.format(&values)
    }

    /// All documents rendered and joined with the separator.
    pub fn format_context(&self, documents: &[Document]) -> Result<String> {
        let parts = documents
            .iter()
            .map(|d| self.format_document(d))
            .collect::<Result<Vec<_>>>()?;
        Ok(parts.join(&self.document_separator))
    }
}

#[async_trait]
impl<L: ChatModel> CombineDocuments for StuffDocumentsChain<L> {
    async fn combine(&self, documents: &[Document], input: &str) -> Result<String> {
        let context = self.format_context(documents)?;
        let rendered = self
            .prompt
            .format(&[(DOCUMENT_VARIABLE, context.as_str()), (INPUT_VARIABLE, input)])?;

        debug!(
            "Stuffed {} documents ({} chars) into prompt for {}",
            documents.len(),
            context.len(),
            self.llm.model()
        );

        self.llm.generate(vec![ChatMessage::user(rendered)]).await
    }
}

/// Bind a model and a prompt into a stuff-documents step.
pub fn create_stuff_documents_chain<L: ChatModel>(
    llm: L,
    prompt: PromptTemplate,
) -> Result<StuffDocumentsChain<L>> {
    StuffDocumentsChain::new(llm, prompt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::get_prompt;
    use std::sync::{Arc, Mutex};

    /// Echoes a fixed reply and records what it was sent.
    struct RecordingModel {
        reply: String,
        seen: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
    }

    #[async_trait]
    impl ChatModel for RecordingModel {
        async fn generate(&self, messages: Vec<ChatMessage>) -> Result<String> {
            self.seen.lock().unwrap().push(messages);
            Ok(self.reply.clone())
        }

        fn model(&self) -> &str {
            "recording"
        }
    }

    fn recording(reply: &str) -> (RecordingModel, Arc<Mutex<Vec<Vec<ChatMessage>>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        (
            RecordingModel {
                reply: reply.to_string(),
                seen: seen.clone(),
            },
            seen,
        )
    }

    #[test]
    fn test_prompt_without_context_slot_rejected() {
        let (llm, _) = recording("x");
        let prompt = PromptTemplate::from_template("Question: {input}").unwrap();
        assert!(matches!(
            create_stuff_documents_chain(llm, prompt),
            Err(Error::Prompt(_))
        ));
    }

    #[test]
    fn test_format_context_joins_with_blank_line() {
        let (llm, _) = recording("x");
        let chain = create_stuff_documents_chain(llm, get_prompt()).unwrap();
        let docs = vec![Document::new("doc1"), Document::new("doc2"), Document::new("doc3")];
        assert_eq!(chain.format_context(&docs).unwrap(), "doc1\n\ndoc2\n\ndoc3");
        assert_eq!(chain.format_context(&[]).unwrap(), "");
    }

    #[test]
    fn test_document_prompt_reads_metadata() {
        let (llm, _) = recording("x");
        let chain = create_stuff_documents_chain(llm, get_prompt())
            .unwrap()
            .with_document_prompt(
                PromptTemplate::from_template("[{source} p{page}] {page_content}").unwrap(),
            )
            .with_document_separator("\n");
        let docs = vec![
            Document::new("alpha")
                .with_metadata("source", serde_json::json!("a.md"))
                .with_metadata("page", serde_json::json!(2)),
        ];
        assert_eq!(chain.format_context(&docs).unwrap(), "[a.md p2] alpha");

        let err = chain.format_context(&[Document::new("no metadata")]).unwrap_err();
        assert!(matches!(err, Error::Prompt(_)));
    }

    #[tokio::test]
    async fn test_combine_sends_one_user_message() {
        let (llm, seen) = recording("42");
        let chain = create_stuff_documents_chain(llm, get_prompt()).unwrap();
        let docs = vec![Document::new("doc1"), Document::new("doc2")];

        let answer = chain.combine(&docs, "What is the answer?").await.unwrap();
        assert_eq!(answer, "42");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].len(), 1);
        assert_eq!(seen[0][0].role, "user");
        assert!(seen[0][0].content.contains("<context>\ndoc1\n\ndoc2\n</context>"));
        assert!(seen[0][0].content.ends_with("Question: What is the answer?"));
    }
}
