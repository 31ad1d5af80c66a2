//! Prompt rendering and reply parsing for chat-completion providers

use std::fmt::Write as _;

use tracing::warn;

use super::{Bug, CompletionPayload, CompletionRequest, OperationKind};
use crate::constants::{DEFAULT_DOC_STYLE, DEFAULT_LANGUAGE};

/// Render the user prompt for a request
#[must_use]
pub fn render(request: &CompletionRequest) -> String {
    let fields = request.fields();
    let language = fields.language().unwrap_or(DEFAULT_LANGUAGE);
    let code = fields.code().unwrap_or_default();
    let mut out = String::new();

    match request.kind() {
        OperationKind::Generate => {
            let _ = writeln!(
                out,
                "You are an expert {language} programmer. Generate clean, efficient, and well-documented code.\n"
            );
            let _ = writeln!(out, "Task: {}\n", fields.prompt().unwrap_or_default());
            if let Some(context) = fields.context().filter(|c| !c.is_empty()) {
                let _ = writeln!(out, "Context: {context}\n");
            }
            out.push_str("Provide the code with inline comments explaining key parts.\n\nCode:");
        }
        OperationKind::Explain => {
            let _ = writeln!(
                out,
                "You are an expert {language} programmer. Explain the following code in detail.\n"
            );
            push_code_block(&mut out, language, code);
            out.push_str(
                "Provide a clear, structured explanation that covers:\n\
                 1. Overall purpose\n\
                 2. Key components and their functions\n\
                 3. Flow of execution\n\
                 4. Important details or edge cases\n\nExplanation:",
            );
        }
        OperationKind::DetectBugs => {
            let _ = writeln!(
                out,
                "You are an expert {language} code reviewer. Analyze the following code for bugs, vulnerabilities, and issues.\n"
            );
            push_code_block(&mut out, language, code);
            out.push_str(
                "Identify potential bugs, security vulnerabilities, performance issues, and code smells.\n\n\
                 For each issue found, provide:\n\
                 - Line number (if applicable, otherwise null)\n\
                 - Severity (info, low, medium, high, critical)\n\
                 - Description\n\
                 - Suggestion to fix\n\n\
                 Format your response as a JSON array of objects with keys: line, severity, description, suggestion.\n\n\
                 Response:",
            );
        }
        OperationKind::Refactor => {
            let _ = writeln!(
                out,
                "You are an expert {language} programmer specializing in code refactoring.\n\nOriginal Code:"
            );
            push_code_block(&mut out, language, code);
            if let Some(instructions) = fields.instructions().filter(|i| !i.is_empty()) {
                let _ = writeln!(out, "Specific instructions: {instructions}\n");
            }
            out.push_str(
                "Refactor this code to:\n\
                 1. Improve readability and maintainability\n\
                 2. Follow best practices and design patterns\n\
                 3. Optimize performance where possible\n\
                 4. Add proper error handling\n\
                 5. Improve naming conventions\n\n\
                 Provide the refactored code and explain the changes made.\n\nRefactored Code:",
            );
        }
        OperationKind::Document => {
            let style = fields.style().unwrap_or(DEFAULT_DOC_STYLE);
            let _ = writeln!(
                out,
                "You are an expert {language} programmer. Add comprehensive documentation to the following code.\n"
            );
            push_code_block(&mut out, language, code);
            let _ = write!(
                out,
                "Add documentation following the {style} style guide. Include:\n\
                 1. Module/file-level docstrings\n\
                 2. Function/method docstrings with parameters, returns, and examples\n\
                 3. Class docstrings\n\
                 4. Inline comments for complex logic\n\n\
                 Provide the fully documented code:"
            );
        }
    }

    out
}

fn push_code_block(out: &mut String, language: &str, code: &str) {
    let _ = writeln!(out, "Code:\n```{language}\n{code}\n```\n");
}

/// Turn the provider's reply text into the payload for the request's operation
#[must_use]
pub fn parse_reply(request: &CompletionRequest, reply: &str) -> CompletionPayload {
    let text = reply.trim().to_string();
    let language = request.fields().language().unwrap_or(DEFAULT_LANGUAGE);

    match request.kind() {
        OperationKind::Generate => CompletionPayload::Generate {
            explanation: format!(
                "Generated {language} code based on the prompt: {}",
                request.fields().prompt().unwrap_or_default()
            ),
            code: text,
        },
        OperationKind::Explain => CompletionPayload::Explain { explanation: text },
        OperationKind::DetectBugs => CompletionPayload::DetectBugs {
            bugs: parse_bugs(&text),
        },
        OperationKind::Refactor => CompletionPayload::Refactor {
            code: text,
            explanation:
                "Code has been refactored to improve quality, readability, and maintainability."
                    .to_string(),
        },
        OperationKind::Document => CompletionPayload::Document {
            documented_code: text,
        },
    }
}

/// Extract the outermost JSON array from a reply, falling back to a single
/// `info` finding carrying the raw text.
#[must_use]
pub fn parse_bugs(reply: &str) -> Vec<Bug> {
    let array = reply
        .find('[')
        .zip(reply.rfind(']'))
        .filter(|(start, end)| start < end)
        .map(|(start, end)| &reply[start..=end]);

    match array.map(serde_json::from_str::<Vec<Bug>>) {
        Some(Ok(bugs)) => bugs,
        Some(Err(e)) => {
            warn!(error = %e, "Failed to parse bug detection response");
            vec![Bug::unstructured(reply)]
        }
        None => vec![Bug::unstructured(reply)],
    }
}
