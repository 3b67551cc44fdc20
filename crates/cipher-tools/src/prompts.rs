//! Instruction templates for each tool channel.

use cipher_core::{ToolKind, ToolRequest};

/// A ready-to-send `(prompt, system instruction)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub prompt: String,
    pub system: String,
}

pub fn build(request: &ToolRequest) -> Instruction {
    let lang = request.source_language.as_str();
    let path = request.source_path.as_str();
    let code = request.payload.code.as_str();

    match request.kind {
        ToolKind::Explain => Instruction {
            system: format!(
                "You are a helpful programming tutor. Your task is to analyze the provided code snippet written in {lang} and explain its purpose, key components, and function flow in clear, easy-to-understand language. Focus on the context ({lang}/{path}) and be concise."
            ),
            prompt: format!("Explain the following code from file {path}:\n\n```{code}```"),
        },
        ToolKind::Review => Instruction {
            system: format!(
                "You are an expert code reviewer specializing in modern {lang} and software best practices. Analyze the provided code for potential improvements, bugs, or refactoring suggestions. Your response should be structured with markdown bullet points and code examples where applicable. If no issues are found, state \"Code looks great! Ready for commit.\""
            ),
            prompt: format!(
                "Review the following code from file {path} in {lang} and suggest improvements:\n\n```{code}```"
            ),
        },
        ToolKind::Generate => {
            let description = request.payload.prompt.as_deref().unwrap_or_default();
            Instruction {
                system: format!(
                    "You are a top-tier software engineer specializing in {lang}. Generate a complete, self-contained code snippet based on the user's description. Enclose the code in a single markdown code block (e.g., ```{lang}...```). Do not include any text outside the markdown code block."
                ),
                prompt: format!(
                    "Generate code for the following in {lang}, suitable for file {path}: {description}"
                ),
            }
        }
        ToolKind::Convert => {
            let target = request.payload.target_language.as_deref().unwrap_or(lang);
            Instruction {
                system: format!(
                    "You are an expert code translator. Your task is to accurately convert the provided code from {lang} to {target}. The output must contain ONLY the converted code snippet, enclosed in a single markdown code block (e.g., ```{target}...```). Do not include any explanatory text or commentary outside the markdown block."
                ),
                prompt: format!("Convert the following code from {lang} to {target}:\n\n```{code}```"),
            }
        }
        ToolKind::SimulateExecution => Instruction {
            system: format!(
                "You are a terminal emulator for {lang}. Given the user's code, execute it mentally and provide the console output. Respond with ONLY the expected terminal output text. Do not provide code blocks, explanations, or commentary. If the code is complex, multi-file, or requires user input, respond with \"Simulation too complex or interactive. Cannot determine output.\""
            ),
            prompt: format!(
                "Simulate the console output for the following {lang} code:\n\n```{lang}\n{code}\n```"
            ),
        },
    }
}
