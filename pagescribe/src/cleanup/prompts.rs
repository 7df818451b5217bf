//! Prompt template for the cleanup pass
//!
//! Uses plain `format!()` interpolation; the raw OCR text is appended verbatim
//! after the instructions.

/// Build the cleanup prompt for one page of OCR output.
///
/// # Example
/// ```
/// use pagescribe::cleanup::prompts::cleanup_prompt;
///
/// let prompt = cleanup_prompt("Mar 3\nwarm up dril ls");
/// assert!(prompt.ends_with("Mar 3\nwarm up dril ls"));
/// ```
pub fn cleanup_prompt(raw_text: &str) -> String {
    format!(
        r#"You are cleaning OCR output from photographed handwritten notebook pages.
Rules:
- Preserve meaning; do not invent details.
- Fix obvious OCR artifacts (broken words, random line breaks).
- Keep original ordering.
- Output as Markdown.
- If a date is present, put it as a top-level heading.
- Use bullets where appropriate.

OCR TEXT:
{raw_text}"#
    )
}
