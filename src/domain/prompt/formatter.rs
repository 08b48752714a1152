//! Rendering retrieved rules into a bounded text block

use crate::domain::search::SearchResult;

/// Heading placed above the rendered rules
pub const RULES_HEADER: &str = "## Reference Rules";

const BLOCK_SEPARATOR: &str = "\n\n";

/// Marker appended when blocks were dropped for size
pub fn omitted_marker(count: usize) -> String {
    format!("({} more rule(s) omitted)", count)
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Render one search result as a self-contained block
pub fn format_block(result: &SearchResult) -> String {
    let rule = &result.rule;
    let mut lines = Vec::new();

    let heading = rule.heading().unwrap_or(rule.id.as_str());
    match rule.category.as_deref() {
        Some(category) => lines.push(format!("### {} [{}]", heading, category)),
        None => lines.push(format!("### {}", heading)),
    }

    if !rule.content.trim().is_empty() {
        lines.push(rule.content.trim().to_string());
    }

    // The statement is already the heading when there is no title
    if let (Some(statement), Some(_)) = (rule.rule.as_deref(), rule.title.as_deref()) {
        lines.push(format!("Rule: {}", statement));
    }

    if let Some(explanation) = rule.explanation.as_deref() {
        lines.push(format!("Explanation: {}", explanation));
    }

    if !rule.examples.is_empty() {
        lines.push("Examples:".to_string());
        lines.extend(rule.examples.iter().map(|e| format!("- {}", e)));
    }

    lines.push(format!(
        "Priority: {} ({})",
        rule.priority.name(),
        rule.priority.level()
    ));

    lines.join("\n")
}

/// Render results under a character budget
///
/// Blocks are taken in order and each is fully included or fully dropped.
/// Rendering stops at the first block that does not fit; the remaining
/// count is reported with [`omitted_marker`], whose space is reserved up
/// front. The output never exceeds `max_chars`. With no results, or a
/// budget too small even for the marker, the output is empty.
pub fn format_results(results: &[SearchResult], max_chars: usize) -> String {
    if results.is_empty() {
        return String::new();
    }

    let total = results.len();
    let mut output = RULES_HEADER.to_string();
    let mut used = char_len(RULES_HEADER);
    let mut included = 0;

    for (index, result) in results.iter().enumerate() {
        let block = format_block(result);
        let next = used + char_len(BLOCK_SEPARATOR) + char_len(&block);

        let remaining_after = total - index - 1;
        let reserve = if remaining_after > 0 {
            char_len(BLOCK_SEPARATOR) + char_len(&omitted_marker(remaining_after))
        } else {
            0
        };

        if next + reserve > max_chars {
            break;
        }

        output.push_str(BLOCK_SEPARATOR);
        output.push_str(&block);
        used = next;
        included += 1;
    }

    let omitted = total - included;
    if omitted == 0 {
        return output;
    }

    let marker = omitted_marker(omitted);
    if included == 0 {
        // Header without blocks is noise; the marker alone says what happened
        return if char_len(&marker) <= max_chars {
            marker
        } else {
            String::new()
        };
    }

    output.push_str(BLOCK_SEPARATOR);
    output.push_str(&marker);
    output
}
