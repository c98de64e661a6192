//! Prompt preparation: serialize the run context, load repo instructions,
//! and render the task prompt into `outputs/`.

use fh_domain::context::LlmContext;
use fh_domain::Result;

use super::instructions::build_repo_instructions;
use super::workspace::Workspace;

const CONTEXT_FILE: &str = "context.json";
const INSTRUCTIONS_FILE: &str = "repo_instructions.md";
const PROMPT_FILE: &str = "prompt.md";
const OUTPUT_FILE: &str = "llm_response.json";

fn render_prompt(context_name: &str, instructions_name: &str, output_name: &str) -> String {
    [
        "You are an autonomous engineering agent running in a repo workspace.",
        "Repository root: current working directory.",
        &format!("Read the issue/PR context from: {context_name}."),
        &format!("Read repository instructions from: {instructions_name}."),
        "Follow all repository instructions when making changes.",
        "Repository instructions are layered from root to leaf; more specific sections should override broader ones.",
        "If the given information is far from enough, respond with decision=needs_info and explain why.",
        "",
        "Required JSON fields: decision, needs_info_comment, commit_message, pr_title, pr_body, files, summary.",
        "The decision field MUST be one of: proceed (changes ready to submit as PR), needs_info (need more information from user), stop (issue should not be automated).",
        "",
        "IMPORTANT: Use the 'files' field to specify file changes.",
        "The 'files' field is a JSON object mapping relative file paths to their COMPLETE new content.",
        "Example: {\"files\": {\"README.md\": \"# Title\\n\\nNew content here...\"}}",
        "Do NOT use the 'patch' field - always use 'files' instead.",
        "",
        "Output JSON only. Do not include markdown or extra text.",
        &format!("You may either write the JSON to stdout or write it to: {output_name}."),
    ]
    .join("\n")
}

/// Write `context.json`, `repo_instructions.md`, and `prompt.md` into the
/// workspace outputs, and fill the context's prompt and output path.
pub async fn prepare(ws: &Workspace, mut ctx: LlmContext) -> Result<LlmContext> {
    let outputs = ws.outputs_dir();

    let context_json = serde_json::to_string_pretty(&ctx)?;
    tokio::fs::write(outputs.join(CONTEXT_FILE), context_json).await?;

    let instructions = build_repo_instructions(&ws.repo_dir());
    tokio::fs::write(outputs.join(INSTRUCTIONS_FILE), &instructions).await?;

    let prompt = render_prompt(CONTEXT_FILE, INSTRUCTIONS_FILE, OUTPUT_FILE);
    tokio::fs::write(outputs.join(PROMPT_FILE), &prompt).await?;

    ctx.repo_instructions = instructions;
    ctx.prompt = prompt;
    ctx.output_path = outputs.join(OUTPUT_FILE).to_string_lossy().into_owned();
    Ok(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fh_domain::context::RunMode;

    #[tokio::test]
    async fn prepare_writes_the_three_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace {
            root: tmp.path().to_path_buf(),
        };
        tokio::fs::create_dir_all(ws.outputs_dir()).await.unwrap();
        tokio::fs::create_dir_all(ws.repo_dir()).await.unwrap();
        std::fs::write(ws.repo_dir().join("AGENT.md"), "house rules").unwrap();

        let mut ctx = LlmContext::new(
            RunMode::Issue,
            ws.repo_dir().to_string_lossy(),
            "org/repo",
        );
        ctx.issue_number = 12;
        let ctx = prepare(&ws, ctx).await.unwrap();

        let outputs = ws.outputs_dir();
        let context_json = std::fs::read_to_string(outputs.join("context.json")).unwrap();
        assert!(context_json.contains("\"issue_number\": 12"));
        let instructions =
            std::fs::read_to_string(outputs.join("repo_instructions.md")).unwrap();
        assert_eq!(instructions, "house rules");
        let prompt = std::fs::read_to_string(outputs.join("prompt.md")).unwrap();
        assert!(prompt.contains("decision"));

        assert_eq!(ctx.repo_instructions, "house rules");
        assert!(!ctx.prompt.is_empty());
        assert!(ctx.output_path.ends_with("llm_response.json"));
    }
}
