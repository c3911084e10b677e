use async_trait::async_trait;
use docforge_core::{Document, GenerationError, Processor, ProcessorInput};
use std::fmt::Write as _;

/// Upper bound on how much of each upstream document is quoted in a prompt.
const UPSTREAM_EXCERPT_CHARS: usize = 1200;

/// Prompt-driven processor used for every built-in document type.
///
/// Builds a prompt from the task, the project context and the artifacts of
/// the task's dependencies, asks the content generator for the body, and
/// wraps it with the document header.
#[derive(Debug, Clone)]
pub struct TemplateProcessor {
    sections: Vec<String>,
}

impl TemplateProcessor {
    pub fn new<I, S>(sections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sections: sections.into_iter().map(Into::into).collect(),
        }
    }

    pub fn sections(&self) -> &[String] {
        &self.sections
    }

    fn build_prompt(&self, input: &ProcessorInput<'_>) -> String {
        let task = input.task;
        let context = input.context;
        let mut prompt = String::new();

        let _ = writeln!(
            prompt,
            "Write the {} for project \"{}\" (Project ID: {}).",
            task.title, context.project_name, context.project_id
        );
        if let Some(organization) = &context.organization {
            let _ = writeln!(prompt, "Organization: {}", organization);
        }
        if !context.stakeholders.is_empty() {
            let _ = writeln!(prompt, "Stakeholders: {}", context.stakeholders.join(", "));
        }

        let _ = writeln!(prompt, "Use exactly these Markdown sections, in order:");
        for section in &self.sections {
            let _ = writeln!(prompt, "## {}", section);
        }

        for dependency in &task.dependencies {
            if let Some(artifact) = input.upstream.get(dependency) {
                let _ = writeln!(
                    prompt,
                    "\nReference material from the {}:\n{}",
                    artifact.title,
                    excerpt(&artifact.content, UPSTREAM_EXCERPT_CHARS)
                );
            }
        }

        prompt
    }
}

#[async_trait]
impl Processor for TemplateProcessor {
    async fn produce<'a>(&self, input: ProcessorInput<'a>) -> Result<Document, GenerationError> {
        let prompt = self.build_prompt(&input);
        let body = input.generator.generate(input.request(prompt)).await?;

        let body = body.trim();
        if body.is_empty() {
            return Err(GenerationError::transient("content generator returned an empty body"));
        }

        let task = input.task;
        let context = input.context;
        let content = format!(
            "# {}\n\nProject ID: {}\nProject: {}\n\n{}\n",
            task.title, context.project_id, context.project_name, body
        );

        Ok(Document::new(task.title.clone(), content))
    }
}

fn excerpt(content: &str, max_chars: usize) -> &str {
    match content.char_indices().nth(max_chars) {
        Some((idx, _)) => &content[..idx],
        None => content,
    }
}
