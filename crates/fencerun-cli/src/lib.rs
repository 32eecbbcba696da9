//! Headless driver for fencerun: run every runnable code fence in a markdown
//! file, in document order, and write the merged document back in place.

use anyhow::{Context, Result, bail};
use fencerun_doc::{RenderedResult, index_document, merge};
use fencerun_exec::{ExecutionRequest, LanguageFamily, dispatch};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub fn run() -> Result<()> {
    init_tracing();
    let target = parse_target_path()?;
    let contents = fs::read_to_string(&target)
        .with_context(|| format!("read {}", target.display()))?;
    let working_directory = target.parent().filter(|p| !p.as_os_str().is_empty());

    let updated = run_all_blocks(&contents, working_directory);
    if updated != contents {
        fs::write(&target, updated.as_bytes())
            .with_context(|| format!("write {}", target.display()))?;
    }
    Ok(())
}

/// Run every block whose language maps to a runner family, merging each
/// result before moving on. The index is rebuilt from the current text
/// before every merge; a merge is never applied through a stale index.
/// Duplicated snippets share an identifier and therefore run once.
pub fn run_all_blocks(document: &str, working_directory: Option<&Path>) -> String {
    let mut current = document.to_string();
    let mut completed: HashSet<String> = HashSet::new();

    loop {
        let index = index_document(&current);
        let next = index
            .identifiers()
            .find(|id| !completed.contains(*id) && runnable(&index, id))
            .map(str::to_string);
        let Some(id) = next else {
            break;
        };
        let Some(block) = index.get(&id) else {
            break;
        };

        eprintln!("Running {} block {}", block.language, &id[..12.min(id.len())]);
        let request = ExecutionRequest {
            language: block.language.clone(),
            code: block.raw.clone(),
            working_directory: working_directory.map(Path::to_path_buf),
            id: id.clone(),
        };
        let result = dispatch(&request);
        debug!(
            id = %request.id,
            status = %result.status,
            duration_ms = result.duration_ms,
            "block finished"
        );

        let body = result.rendered_body();
        let rendered = RenderedResult {
            exit_code: result.exit_code,
            status: result.status.as_str(),
            output: &body,
        };
        let updated = merge(&current, &index, &id, &rendered);
        current = updated;
        completed.insert(id);
    }

    current
}

fn runnable(index: &fencerun_doc::BlockIndex, id: &str) -> bool {
    index
        .get(id)
        .map(|block| LanguageFamily::from_tag(&block.language).is_some())
        .unwrap_or(false)
}

fn parse_target_path() -> Result<PathBuf> {
    let mut args = std::env::args().skip(1);
    match (args.next(), args.next()) {
        (Some(path), None) => Ok(PathBuf::from(path)),
        (None, None) => {
            eprintln!("No path provided, defaulting to README.md");
            Ok(PathBuf::from("README.md"))
        }
        _ => bail!("Usage: fencerun <path-to-markdown>"),
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::run_all_blocks;
    use fencerun_doc::{SEGMENT_START_PREFIX, parse};
    use indoc::indoc;

    #[test]
    fn plain_fences_are_left_untouched() {
        let doc = indoc! {r#"
        ```
        not runnable
        ```
        ```text
        also not runnable
        ```
        "#};
        assert_eq!(run_all_blocks(doc, None), doc);
    }

    #[test]
    fn unknown_language_is_skipped() {
        // `ruby` maps to no runner family, so the driver never dispatches it.
        let doc = "```ruby\nputs 1\n```\n";
        assert_eq!(run_all_blocks(doc, None), doc);
    }

    #[cfg(unix)]
    #[test]
    fn shell_blocks_run_and_merge_in_order() {
        let doc = indoc! {r#"
        ```sh
        echo first
        ```
        ```sh
        echo second
        ```
        "#};
        let merged = run_all_blocks(doc, None);
        assert_eq!(merged.matches(SEGMENT_START_PREFIX).count(), 2);
        assert!(merged.contains("first\n"));
        assert!(merged.contains("second\n"));
        // Re-running reaches a fixpoint.
        assert_eq!(run_all_blocks(&merged, None), merged);
    }

    #[cfg(unix)]
    #[test]
    fn output_segments_are_not_treated_as_runnable_blocks() {
        let doc = "```sh\necho once\n```\n";
        let merged = run_all_blocks(doc, None);
        // The merged text contains a `text` fence; a second pass must not
        // try to execute it.
        assert!(parse(&merged).iter().any(|b| b.language == "text"));
        assert_eq!(merged.matches(SEGMENT_START_PREFIX).count(), 1);
    }
}
