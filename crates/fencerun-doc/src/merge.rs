use crate::fences::{closes_fence, line_bounds};
use crate::index::BlockIndex;

pub const SEGMENT_START_PREFIX: &str = "<!-- exec-output:start id=";
pub const SEGMENT_START_SUFFIX: &str = " -->";
pub const SEGMENT_END: &str = "<!-- exec-output:end -->";

const MIN_WRAP_FENCE: usize = 3;

/// Execution outcome fields the merger needs to render a segment. The caller
/// owns combining stdout, stderr and any fallback message into `output`.
#[derive(Debug, Clone, Copy)]
pub struct RenderedResult<'a> {
    pub exit_code: Option<i32>,
    pub status: &'a str,
    pub output: &'a str,
}

/// Splice the output segment for `identifier` into `document` immediately
/// after its block, replacing any prior segment for the same identifier.
///
/// An identifier absent from the index means the block disappeared between
/// parse and merge; the document comes back unchanged. Exactly one live
/// segment per identifier survives a merge.
pub fn merge(
    document: &str,
    index: &BlockIndex,
    identifier: &str,
    result: &RenderedResult<'_>,
) -> String {
    let Some(block) = index.get(identifier) else {
        return document.to_string();
    };
    let insert_at = block.end.min(document.len());
    let eol = dominant_line_ending(document);
    let rest_start = existing_segment_end(document, insert_at, identifier).unwrap_or(insert_at);

    let head = &document[..insert_at];
    let rest = &document[rest_start..];
    let segment = render_segment(identifier, result, eol);

    let mut updated = String::with_capacity(head.len() + segment.len() + rest.len() + 8);
    updated.push_str(head);
    if !head.is_empty() && !head.ends_with('\n') {
        updated.push_str(eol);
    }
    updated.push_str(&segment);
    if !rest.is_empty() && !rest.starts_with('\n') && !rest.starts_with("\r\n") {
        updated.push_str(eol);
    }
    updated.push_str(rest);
    updated
}

/// Majority vote between the two line-ending conventions present in the
/// document; LF wins ties and empty documents.
fn dominant_line_ending(document: &str) -> &'static str {
    let crlf = document.matches("\r\n").count();
    let lf = document.matches('\n').count() - crlf;
    if crlf > lf { "\r\n" } else { "\n" }
}

/// End offset of an output segment for `identifier` sitting immediately
/// (only whitespace allowed) after `from`, or None. The segment is walked
/// structurally - start marker, wrapping fence, body, closing fence, end
/// marker - so marker-lookalike text inside the fenced body cannot truncate
/// the removal.
fn existing_segment_end(document: &str, from: usize, identifier: &str) -> Option<usize> {
    let tail = &document[from..];
    let gap = tail.len() - tail.trim_start().len();
    let candidate = from + gap;
    if candidate >= document.len() {
        return None;
    }

    let (marker_end, fence_start) = line_bounds(document, candidate);
    let id = document[candidate..marker_end]
        .trim_end()
        .strip_prefix(SEGMENT_START_PREFIX)?
        .strip_suffix(SEGMENT_START_SUFFIX)?;
    if id != identifier {
        return None;
    }

    let (fence_end, mut cursor) = line_bounds(document, fence_start);
    let run = document[fence_start..fence_end]
        .chars()
        .take_while(|&c| c == '`')
        .count();
    if run < MIN_WRAP_FENCE {
        return None;
    }

    loop {
        if cursor >= document.len() {
            return None;
        }
        let (line_end, next) = line_bounds(document, cursor);
        let closed = closes_fence(&document[cursor..line_end], '`', run);
        cursor = next;
        if closed {
            break;
        }
    }

    let (line_end, next) = line_bounds(document, cursor);
    if document[cursor..line_end].trim_end() != SEGMENT_END {
        return None;
    }
    Some(next)
}

fn render_segment(identifier: &str, result: &RenderedResult<'_>, eol: &str) -> String {
    let fence = "`".repeat(wrap_fence_len(result.output));
    let code = match result.exit_code {
        Some(code) => code.to_string(),
        None => "N/A".to_string(),
    };

    let mut lines: Vec<String> = Vec::new();
    lines.push(format!("{SEGMENT_START_PREFIX}{identifier}{SEGMENT_START_SUFFIX}"));
    lines.push(format!("{fence}text"));
    lines.push(format!("exitCode: {code} status: {}", result.status));
    for line in result.output.lines() {
        lines.push(line.to_string());
    }
    lines.push(fence);
    lines.push(SEGMENT_END.to_string());
    lines.join(eol)
}

/// Wrapping fence length: one more than the longest backtick run anywhere in
/// the body, never below three. The wrapper can therefore never be closed
/// early by fences the output itself contains.
fn wrap_fence_len(body: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for ch in body.chars() {
        if ch == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    (longest + 1).max(MIN_WRAP_FENCE)
}
