use line_ending::LineEnding;

pub(crate) const PLAIN_LANGUAGE: &str = "plaintext";

/// A fenced code block extracted from a document.
///
/// `start..end` spans the entire construct in byte offsets of the original
/// document, including both fence lines and the line terminator after the
/// closing fence, so callers can splice new text directly after the block
/// without leaving stray blank lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub start: usize,
    pub end: usize,
    pub language: String,
    pub fence_char: char,
    pub fence_len: usize,
    /// Content between the fences, verbatim.
    pub raw: String,
    /// `raw` with all line-ending variants collapsed to `\n`. Feeds identity
    /// computation only.
    pub normalized: String,
}

/// Scan `document` for fenced code blocks, in document order.
///
/// A fence opens with three or more identical fence characters at the start
/// of a line and closes with a line of at least that many of the same
/// character plus optional trailing whitespace. An unterminated fence halts
/// extraction; nothing past it is scanned.
pub fn parse(document: &str) -> Vec<CodeBlock> {
    let mut blocks = Vec::new();
    let mut cursor = 0;
    while cursor < document.len() {
        let (line_end, next) = line_bounds(document, cursor);
        let line = &document[cursor..line_end];
        let Some((fence_char, fence_len, info)) = open_fence(line) else {
            cursor = next;
            continue;
        };
        let content_start = next;
        let Some((content_end, block_end)) =
            find_close(document, content_start, fence_char, fence_len)
        else {
            break;
        };
        let raw = document[content_start..content_end].to_string();
        let normalized = LineEnding::normalize(&raw);
        blocks.push(CodeBlock {
            start: cursor,
            end: block_end,
            language: normalize_language(info),
            fence_char,
            fence_len,
            raw,
            normalized,
        });
        cursor = block_end;
    }
    blocks
}

/// Byte bounds of the line starting at `start`: end of the line's content
/// (excluding any `\r\n` or `\n`) and the offset just past its terminator.
pub(crate) fn line_bounds(document: &str, start: usize) -> (usize, usize) {
    match document[start..].find('\n') {
        Some(rel) => {
            let nl = start + rel;
            let content_end = if nl > start && document.as_bytes()[nl - 1] == b'\r' {
                nl - 1
            } else {
                nl
            };
            (content_end, nl + 1)
        }
        None => (document.len(), document.len()),
    }
}

fn open_fence(line: &str) -> Option<(char, usize, &str)> {
    let fence_char = line.chars().next()?;
    if fence_char != '`' && fence_char != '~' {
        return None;
    }
    let run = line.chars().take_while(|&c| c == fence_char).count();
    if run < 3 {
        return None;
    }
    // Fence characters are single-byte, so `run` is a byte offset too.
    Some((fence_char, run, &line[run..]))
}

/// A closing line is a run of at least `min_len` fence characters with
/// nothing but trailing whitespace before the line end. A content line that
/// merely starts with the fence character does not close the block.
pub(crate) fn closes_fence(line: &str, fence_char: char, min_len: usize) -> bool {
    let trimmed = line.trim_end();
    !trimmed.is_empty()
        && trimmed.chars().all(|c| c == fence_char)
        && trimmed.chars().count() >= min_len
}

fn find_close(
    document: &str,
    mut cursor: usize,
    fence_char: char,
    min_len: usize,
) -> Option<(usize, usize)> {
    while cursor < document.len() {
        let (line_end, next) = line_bounds(document, cursor);
        if closes_fence(&document[cursor..line_end], fence_char, min_len) {
            return Some((cursor, next));
        }
        cursor = next;
    }
    None
}

fn normalize_language(info: &str) -> String {
    match info.split_whitespace().next() {
        Some(tag) => tag.to_lowercase(),
        None => PLAIN_LANGUAGE.to_string(),
    }
}
