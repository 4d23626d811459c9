use docsmith::ooxml::docx::{AnchorQuery, Position, RunFormat};
use docsmith::{Workspace, ops};
use proptest::prelude::*;

/// A workspace holding `doc.docx` with paragraphs `p0`, `p1`, ...
fn numbered(count: usize) -> (tempfile::TempDir, Workspace) {
    let dir = tempfile::tempdir().unwrap();
    let ws = Workspace::open(dir.path());
    ops::create_document(&ws, "doc", None, None).unwrap();
    for i in 0..count {
        ops::add_paragraph(&ws, "doc", &format!("p{}", i), None, &RunFormat::default()).unwrap();
    }
    (dir, ws)
}

fn texts(ws: &Workspace) -> Vec<String> {
    ops::get_document_text(ws, "doc")
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

fn case() -> impl Strategy<Value = (usize, usize, bool)> {
    (1usize..6).prop_flat_map(|count| (Just(count), 0..count, any::<bool>()))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_insertion_index_law((count, anchor, after) in case()) {
        let (_dir, ws) = numbered(count);
        let before = texts(&ws);
        let position = if after { Position::After } else { Position::Before };

        let index = ops::insert_paragraph(&ws, "doc", &AnchorQuery::index(anchor), "new", None, position).unwrap();
        let expected = if after { anchor + 1 } else { anchor };
        prop_assert_eq!(index, expected);

        let now = texts(&ws);
        prop_assert_eq!(now.len(), count + 1);
        prop_assert_eq!(&now[index], "new");
        prop_assert_eq!(&now[..index], &before[..index]);
        prop_assert_eq!(&now[index + 1..], &before[index..]);
    }

    #[test]
    fn prop_footnote_ids_are_sequential(notes in 1usize..6) {
        let (_dir, ws) = numbered(2);
        for expected in 1..=notes {
            let id = ops::add_footnote(&ws, "doc", expected % 2, &format!("note {}", expected)).unwrap();
            prop_assert_eq!(id as usize, expected);
        }
    }

    #[test]
    fn prop_text_resolution_is_deterministic(count in 1usize..6) {
        let (_dir, ws) = numbered(count);
        let options = Default::default();
        let first = ops::find_text(&ws, "doc", "p", options).unwrap();
        let second = ops::find_text(&ws, "doc", "p", options).unwrap();
        prop_assert_eq!(first.len(), count);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_empty_marker_span_is_noop(count in 0usize..4) {
        let (_dir, ws) = numbered(0);
        ops::add_paragraph(&ws, "doc", "[begin]", None, &RunFormat::default()).unwrap();
        ops::add_paragraph(&ws, "doc", "[end]", None, &RunFormat::default()).unwrap();
        for i in 0..count {
            ops::add_paragraph(&ws, "doc", &format!("tail {}", i), None, &RunFormat::default()).unwrap();
        }
        let before = texts(&ws);
        let outcome = ops::replace_between_markers(&ws, "doc", "[begin]", Some("[end]"), &[], None).unwrap();
        prop_assert_eq!(outcome.removed, 0);
        prop_assert_eq!(texts(&ws), before);
    }
}
