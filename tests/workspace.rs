use docsmith::builder::{DocumentContent, TemplateBuilder};
use docsmith::ooxml::docx::{
    AnchorQuery, EditRestriction, ListKind, NoteKind, Position, RunFormat, SignatureStatus,
};
use docsmith::ops;
use docsmith::{Config, Error, ErrorKind, Workspace};

fn workspace() -> (tempfile::TempDir, Workspace) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.working_dir = dir.path().to_path_buf();
    config.protection.spin_count = 50;
    (dir, Workspace::new(config))
}

fn lines(ws: &Workspace, filename: &str) -> Vec<String> {
    ops::get_document_text(ws, filename)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_report_editing_session() {
    let (_dir, ws) = workspace();
    ops::create_document(&ws, "report", Some("Quarterly"), Some("Ana")).unwrap();
    ops::add_heading(&ws, "report", "Summary", 1, &RunFormat::default(), false).unwrap();
    ops::add_paragraph(&ws, "report", "Revenue grew.", None, &RunFormat::default()).unwrap();
    ops::add_heading(&ws, "report", "Risks", 1, &RunFormat::default(), false).unwrap();
    ops::add_paragraph(&ws, "report", "Supply is tight.", None, &RunFormat::default()).unwrap();

    let index = ops::insert_paragraph(
        &ws,
        "report",
        &AnchorQuery::text("Risks"),
        "Costs fell.",
        None,
        Position::Before,
    )
    .unwrap();
    assert_eq!(index, 2);

    let items = vec!["Chips".to_string(), "Freight".to_string()];
    ops::insert_list(&ws, "report", &AnchorQuery::text("Supply"), &items, ListKind::Bullet, 1, Position::After)
        .unwrap();

    let outcome =
        ops::replace_below_header(&ws, "report", "Summary", &["Revenue grew 12%.".to_string()], None).unwrap();
    assert_eq!(outcome.removed, 2);

    assert_eq!(
        lines(&ws, "report"),
        ["Summary", "Revenue grew 12%.", "Risks", "Supply is tight.", "Chips", "Freight"]
    );

    assert_eq!(ops::add_footnote(&ws, "report", 1, "Audited figures.").unwrap(), 1);
    let info = ops::get_document_info(&ws, "report").unwrap();
    assert_eq!(info.title.as_deref(), Some("Quarterly"));
    assert_eq!(info.author.as_deref(), Some("Ana"));
    assert_eq!(info.paragraphs, 6);
}

#[test]
fn test_protected_document_refuses_edits() {
    let (_dir, ws) = workspace();
    ops::create_document(&ws, "locked", None, None).unwrap();
    ops::add_paragraph(&ws, "locked", "Fixed text.", None, &RunFormat::default()).unwrap();
    ops::protect_document(&ws, "locked", "pw", EditRestriction::ReadOnly).unwrap();

    let err = ops::add_footnote(&ws, "locked", 0, "no").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authentication);
    let message = ops::report_display("add_footnote", ops::add_footnote(&ws, "locked", 0, "no"));
    assert!(message.starts_with("Failed to add footnote: "));

    // Reads still work while protected.
    assert_eq!(lines(&ws, "locked"), ["Fixed text."]);

    ops::unprotect_document(&ws, "locked", "pw").unwrap();
    assert_eq!(ops::add_footnote(&ws, "locked", 0, "yes").unwrap(), 1);
}

#[test]
fn test_builder_and_notes() {
    let (_dir, ws) = workspace();
    let content = DocumentContent::from_yaml(
        "title: Paper\nblocks:\n  - type: heading\n    text: Method\n  - type: paragraph\n    text: We measured twice.\n",
    )
    .unwrap();
    ws.create_with_builder("paper", &TemplateBuilder, &content).unwrap();
    assert!(matches!(
        ws.create_with_builder("paper", &TemplateBuilder, &content),
        Err(Error::Validation(_))
    ));

    ops::add_footnote_before_text(&ws, "paper", "twice", "Once was not enough.").unwrap();
    ops::add_footnote(&ws, "paper", 0, "Heading note.").unwrap();
    let report = ops::convert_footnotes_to_endnotes(&ws, "paper").unwrap();
    assert_eq!(report.converted, 2);

    let endnotes = ops::list_notes(&ws, "paper", NoteKind::Endnote).unwrap();
    let ids: Vec<_> = endnotes.iter().map(|n| n.id).collect();
    assert_eq!(ids, [1, 2]);
    assert_eq!(lines(&ws, "paper"), ["Method", "We measured twice."]);
}

#[test]
fn test_documents_listing() {
    let (_dir, ws) = workspace();
    for name in ["b", "a", "c.docx"] {
        ops::create_document(&ws, name, None, None).unwrap();
    }
    let names: Vec<_> = ops::list_documents(&ws, None)
        .unwrap()
        .into_iter()
        .map(|entry| entry.name)
        .collect();
    assert_eq!(names, ["a.docx", "b.docx", "c.docx"]);
    assert_eq!(
        ops::get_document_text(&ws, "missing").unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn test_ampersands_in_metadata_survive_reload() {
    let (_dir, ws) = workspace();
    ops::create_document(&ws, "plan", Some("R & D Plan"), Some("Smith & Co")).unwrap();
    ops::add_paragraph(&ws, "plan", "Budget.", None, &RunFormat::default()).unwrap();

    let info = ops::get_document_info(&ws, "plan").unwrap();
    assert_eq!(info.title.as_deref(), Some("R & D Plan"));
    assert_eq!(info.author.as_deref(), Some("Smith & Co"));

    let signed = ops::create_signature(&ws, "plan", "Legal & Compliance").unwrap();
    assert_eq!(signed.signer, "Legal & Compliance");
    let report = ops::verify_signature(&ws, "plan").unwrap();
    assert_eq!(report.status, SignatureStatus::Valid);
    assert_eq!(report.signer.as_deref(), Some("Legal & Compliance"));
}
