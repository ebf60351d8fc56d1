//! Prompt templates with named `{placeholder}` slots.

use once_cell::sync::Lazy;
use ragchain_core::{Error, Result};
use regex::{Captures, Regex};

/// `{{` and `}}` are literal braces; `{name}` is a slot.
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());

/// The retrieval-QA instruction template. Slots: `context`, `input`.
pub const RAG_TEMPLATE: &str = "\
Answer the following question based only on the provided context.
Think step by step before answering. If you don't know the answer, just say that you don't know.

<context>
{context}
</context>

Question: {input}";

/// A template string plus the slot names it declares.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    template: String,
    input_variables: Vec<String>,
}

impl PromptTemplate {
    /// Parse a template. Fails on a brace that is neither a slot nor escaped.
    pub fn from_template(template: impl Into<String>) -> Result<Self> {
        let template = template.into();

        let mut input_variables: Vec<String> = Vec::new();
        for caps in PLACEHOLDER.captures_iter(&template) {
            if let Some(name) = caps.get(1) {
                if !input_variables.iter().any(|v| v == name.as_str()) {
                    input_variables.push(name.as_str().to_string());
                }
            }
        }

        let stripped = PLACEHOLDER.replace_all(&template, "");
        if let Some(pos) = stripped.find(['{', '}']) {
            let near: String = stripped[pos..].chars().take(20).collect();
            return Err(Error::Prompt(format!("unmatched brace in template near: {:?}", near)));
        }

        Ok(Self {
            template,
            input_variables,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Slot names in order of first appearance.
    pub fn input_variables(&self) -> &[String] {
        &self.input_variables
    }

    /// Fill every slot. Values are inserted verbatim; extra values are ignored.
    pub fn format(&self, values: &[(&str, &str)]) -> Result<String> {
        if let Some(missing) = self
            .input_variables
            .iter()
            .find(|v| !values.iter().any(|(name, _)| *name == v.as_str()))
        {
            return Err(Error::Prompt(format!("missing value for prompt variable '{}'", missing)));
        }

        let rendered = PLACEHOLDER.replace_all(&self.template, |caps: &Captures<'_>| {
            match caps.get(1) {
                Some(name) => values
                    .iter()
                    .find(|(n, _)| *n == name.as_str())
                    .map(|(_, v)| v.to_string())
                    .unwrap_or_default(),
                None => caps[0][..1].to_string(),
            }
        });
        Ok(rendered.into_owned())
    }
}

/// The fixed RAG prompt: answer from `context` only, reason step by step,
/// admit when the answer is not there.
pub fn get_prompt() -> PromptTemplate {
    PromptTemplate::from_template(RAG_TEMPLATE).expect("RAG_TEMPLATE is well-formed")
}
