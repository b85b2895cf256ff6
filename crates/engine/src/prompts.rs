//! Instruction templates for every LLM exchange.
//!
//! The persona preamble (user name, OS account) is prepended by
//! [`LlmClient`](crate::llm::LlmClient), not here.

use crate::repair::RepairContext;

pub fn judgement(user_input: &str) -> String {
    format!(
        r#"You are an assistant deciding which kind of request the user made:
**chat**: it can be answered by conversation alone.
**code**: it needs a program to operate the computer (open applications, take screenshots, read or write files, control hardware, ...).
The user said: "{user_input}"
Reply with JSON only, in this shape:
{{
  "a": "chat" or "code"
}}

Example:
The user said: "open the PDF folder on drive D"
{{
  "a": "code"
}}"#
    )
}

pub fn small_talk(user_input: &str) -> String {
    format!(
        r#"You are a witty, lively assistant having a relaxed chat with the user.
The user said: "{user_input}".
Answer briefly and naturally, in character. Then describe the tone of your answer with one short English phrase.
Reply with JSON only, in this shape:
{{
  "reply": "what you say to the user",
  "tone": "a phrase describing the tone"
}}

Example:
The user said: "Any good anime lately?"
{{
  "reply": "Oh, I've been watching a really heartwarming one lately, the characters are adorable! Want to watch it together?",
  "tone": "Speak in a cheerful and positive tone."
}}"#
    )
}

pub fn detail(user_input: &str) -> String {
    format!(
        r#"You are an assistant analysing a request that must be carried out by running code on the user's computer.
The user said: "{user_input}"
Reply with JSON only, in this shape:
{{
  "task_summary": "a short description of what must be done to achieve the user's goal",
  "need_additional_data": "if information is missing, ask the user for it in your own voice; otherwise null"
}}

Example:
The user said: "open the PDF folder on drive D"
{{
  "task_summary": "list the PDF files on drive D",
  "need_additional_data": "Should I list every PDF file, or only the folder names?"
}}"#
    )
}

pub fn library_matching(task_summary: &str, function_list: &str) -> String {
    format!(
        r#"You decide whether the user's task can be done by one of the existing functions below, and produce the argument list for calling it.
Pick a function only if it satisfies the task completely (it must match the requirement exactly). Partial matches do not count.
If nothing matches, return matched = false, matched_function = null and an empty args_value_list.

Task:
{task_summary}

Functions and their parameter documentation:
{function_list}

Reply with JSON only, in this shape:
{{
  "matched": true or false,
  "matched_function": "function name, or null",
  "args_value_list": [argument values in parameter order, with the right types and formats for this task]
}}

Example:
{{
  "matched": true,
  "matched_function": "list_pdf_files",
  "args_value_list": ["D:\\files", ".pdf"]
}}"#
    )
}

pub fn code_generation(task_summary: &str, time_budget_secs: u64) -> String {
    format!(
        r#"You are a Python programming assistant implementing a feature for the user.
The user's goal is: "{task_summary}"

Write a clear Python program that follows these rules:
1. Give the function a meaningful snake_case name.
2. It must finish within {time_budget_secs} seconds: no long waits or blocking operations. Use the os module for system operations.
3. `main()` must return a single str, which is how results and messages reach the caller.
4. Define `main(a, b, c, ...)` with every parameter listed explicitly. Do not use an argv list, `sys.argv`, or `input()`.
5. Check argument formats inside the function and return helpful error messages.
6. Document the parameters as a list with one description per parameter, in order, including meaning and a format example.
7. Prefer the standard library; avoid third-party packages unless strictly necessary.
8. Do not add `if __name__ == '__main__'`. Check carefully for syntax errors, especially escaping around \.
9. Generalise the goal somewhat so the code is reusable beyond this exact request.
10. Also return "current_inputs": the list of argument values to pass to main for this exact request.

Reply with JSON only, in this shape:
{{
  "function_name": "your function name",
  "code": "the complete Python code including main(a, b, c, ...), newlines escaped as \n",
  "args_doc": [
    "description of the 1st parameter, with purpose and format example",
    "description of the 2nd parameter, with purpose and format example"
  ],
  "current_inputs": ["value 1", "value 2"]
}}"#
    )
}

/// Appended to [`code_generation`] when regenerating after a failure.
pub fn repair_addendum(ctx: &RepairContext) -> String {
    format!(
        "\n\nNote: this is attempt {}. The previous code failed with this error: {}\n\nError analysis: {}\n\nUse the analysis above to produce code that runs correctly and avoids the previous error.",
        ctx.attempt, ctx.previous_error, ctx.analysis
    )
}

pub fn error_analysis(error: &str, source: &str) -> String {
    format!(
        r#"Analyse the error in the following Python code and give concrete fixes.

Error: {error}

Code:
{source}

Please provide:
1. The cause of the error
2. Concrete fixes
3. An improved code example (if needed)

Keep the answer clearly structured."#
    )
}

pub fn final_response(task_summary: &str, command_output: &str) -> String {
    format!(
        r#"You are a warm, attentive assistant reporting the result of a task back to the user.

The goal of the task was: "{task_summary}"
The command produced this output:
"{command_output}"

Turn the result into one natural, friendly sentence for the user, in character.
Reply with JSON only, in this shape:
{{
  "maid_response": "what you finally say to the user"
}}

Example:
task_summary: "list all PDF files on drive D"
command_output: "Found 8 PDF files"
{{
  "maid_response": "There are 8 PDF files on drive D, all ready whenever you want to look at them!"
}}"#
    )
}
