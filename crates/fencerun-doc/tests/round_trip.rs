use fencerun_doc::{RenderedResult, SEGMENT_START_PREFIX, identify, index_document, merge, parse};
use indoc::indoc;

fn synthetic(output: &str) -> RenderedResult<'_> {
    RenderedResult {
        exit_code: Some(0),
        status: "ok",
        output,
    }
}

#[test]
fn round_trip_gives_every_block_exactly_one_segment() {
    let doc = indoc! {r#"
    # demo

    ```python
    print("a")
    ```

    prose in between

    ```sh
    echo b
    ```

    ```js
    console.log("c")
    ```

    closing prose
    "#};

    let original: Vec<(String, String)> = parse(doc)
        .into_iter()
        .map(|block| (identify(&block.language, &block.normalized), block.language))
        .collect();
    assert_eq!(original.len(), 3);

    let mut current = doc.to_string();
    for (id, _) in &original {
        let index = index_document(&current);
        current = merge(&current, &index, id, &synthetic("output\n"));
    }

    // Each original block is immediately followed by its own segment.
    let reparsed = parse(&current);
    for (id, language) in &original {
        let block = reparsed
            .iter()
            .find(|b| &b.language == language)
            .expect("original block survives the merges");
        let marker = format!("{SEGMENT_START_PREFIX}{id}");
        assert!(
            current[block.end..].trim_start().starts_with(&marker),
            "segment for {language} does not immediately follow its block"
        );
        assert_eq!(current.matches(&marker).count(), 1);
    }
    assert!(current.contains("prose in between"));
    assert!(current.contains("closing prose"));
}

#[test]
fn merging_twice_is_structurally_identical_to_merging_once() {
    let doc = "```sh\necho hi\n```\ntrailing text\n";
    let id = identify("sh", "echo hi\n");

    let index = index_document(doc);
    let once = merge(doc, &index, &id, &synthetic("hi\n"));

    let index = index_document(&once);
    let twice = merge(&once, &index, &id, &synthetic("hi\n"));

    assert_eq!(once, twice);
    assert_eq!(parse(&once).len(), parse(&twice).len());
}

#[test]
fn fence_safety_holds_for_fence_laden_output() {
    let doc = "```sh\ncat snippet.md\n```\n";
    let id = identify("sh", "cat snippet.md\n");
    let body = "before\n`````\nnested\n`````\nafter\n";

    let index = index_document(doc);
    let merged = merge(doc, &index, &id, &synthetic(body));

    // The wrapper must be parseable as one block whose content still holds
    // the five-backtick runs.
    let segment_block = parse(&merged)
        .into_iter()
        .find(|b| b.language == "text")
        .expect("output segment parses as a fenced block");
    assert_eq!(segment_block.fence_len, 6);
    assert!(segment_block.raw.contains("`````\nnested"));
}

#[test]
fn merge_with_unknown_identifier_returns_input_unchanged() {
    let doc = "plain text\n```sh\necho hi\n```\n";
    let index = index_document(doc);
    let merged = merge(doc, &index, &"0".repeat(64), &synthetic("x\n"));
    assert_eq!(merged, doc);
}

#[test]
fn duplicated_snippet_answers_once_for_both_copies() {
    let doc = indoc! {r#"
    ```sh
    echo twin
    ```
    middle
    ```sh
    echo twin
    ```
    "#};
    let id = identify("sh", "echo twin\n");
    let index = index_document(doc);
    let merged = merge(doc, &index, &id, &synthetic("twin\n"));

    // One segment, attached to the first occurrence.
    assert_eq!(merged.matches(SEGMENT_START_PREFIX).count(), 1);
    let first_block_end = parse(doc)[0].end;
    assert!(merged[first_block_end..].starts_with(SEGMENT_START_PREFIX));
}
