//! Command-line front end for docsmith.
//!
//! Every subcommand maps onto one operation. Results are printed as YAML
//! (or plain text for document text); a failed operation prints its message
//! to stderr and exits with status 1.
//!
//! ```sh
//! docsmith --working-dir docs create report --title "Q3 Report"
//! docsmith --working-dir docs insert-paragraph report "New finding" --target-text Conclusion --position before
//! docsmith --working-dir docs add-footnote report 0 "See appendix."
//! ```

use clap::{Args, Parser, Subcommand};
use docsmith::builder::{DocumentContent, TemplateBuilder};
use docsmith::convert::OfficeConverter;
use docsmith::ooxml::docx::{AnchorQuery, EditRestriction, ListKind, MatchOptions, NoteKind, Position, RunFormat};
use docsmith::ops::{self, report_display, report_yaml};
use docsmith::{Config, Error, Result, Workspace};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

/// Anchor-based editing of Word documents
#[derive(Parser, Debug)]
#[command(name = "docsmith", version, about)]
struct Cli {
    /// Configuration file (YAML)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory document names are resolved against
    #[arg(long, global = true, value_name = "DIR")]
    working_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Paragraph to anchor on; an explicit index wins over text.
#[derive(Args, Debug)]
struct AnchorArgs {
    /// Text contained in the anchor paragraph
    #[arg(long)]
    target_text: Option<String>,

    /// Index of the anchor paragraph
    #[arg(long)]
    paragraph_index: Option<usize>,

    #[arg(long)]
    match_case: bool,

    #[arg(long)]
    whole_word: bool,

    /// `before` or `after`
    #[arg(long, default_value = "after")]
    position: String,
}

impl AnchorArgs {
    fn query(&self) -> AnchorQuery {
        AnchorQuery {
            target_text: self.target_text.clone(),
            paragraph_index: self.paragraph_index,
            options: MatchOptions {
                match_case: self.match_case,
                whole_word: self.whole_word,
            },
        }
    }
}

/// Direct character formatting.
#[derive(Args, Debug, Default)]
struct FormatArgs {
    #[arg(long)]
    bold: bool,

    #[arg(long)]
    italic: bool,

    #[arg(long)]
    underline: bool,

    /// Hex color such as `1F4E79`
    #[arg(long)]
    color: Option<String>,

    #[arg(long)]
    font_name: Option<String>,

    /// Size in points
    #[arg(long)]
    font_size: Option<f32>,
}

impl From<&FormatArgs> for RunFormat {
    fn from(args: &FormatArgs) -> Self {
        RunFormat {
            bold: args.bold.then_some(true),
            italic: args.italic.then_some(true),
            underline: args.underline.then_some(true),
            color: args.color.clone(),
            font_name: args.font_name.clone(),
            font_size: args.font_size,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a blank document
    Create {
        filename: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        author: Option<String>,
    },
    /// Create a document from a YAML content file
    Build { filename: String, content: PathBuf },
    /// List documents in a directory
    List { directory: Option<String> },
    /// Show metadata and counts
    Info { filename: String },
    /// Show paragraphs and tables
    Outline { filename: String },
    /// Print the document text
    Text { filename: String },
    /// Find every occurrence of a text
    Find {
        filename: String,
        text: String,
        #[arg(long)]
        match_case: bool,
        #[arg(long)]
        whole_word: bool,
    },
    /// Replace text inside runs
    Replace { filename: String, find: String, replace: String },
    /// Append a paragraph
    AddParagraph {
        filename: String,
        text: String,
        #[arg(long)]
        style: Option<String>,
        #[command(flatten)]
        format: FormatArgs,
    },
    /// Append a heading
    AddHeading {
        filename: String,
        text: String,
        #[arg(long, default_value_t = 1)]
        level: u8,
        #[arg(long)]
        border_bottom: bool,
        #[command(flatten)]
        format: FormatArgs,
    },
    /// Append a table; each `--row` is a comma-separated list of cells
    AddTable {
        filename: String,
        rows: usize,
        cols: usize,
        #[arg(long = "row")]
        data: Vec<String>,
    },
    /// Format a character range of one paragraph
    FormatText {
        filename: String,
        paragraph_index: usize,
        start: usize,
        end: usize,
        #[command(flatten)]
        format: FormatArgs,
    },
    /// Create a paragraph style
    CreateStyle {
        filename: String,
        name: String,
        #[arg(long)]
        base_style: Option<String>,
        #[command(flatten)]
        format: FormatArgs,
    },
    /// Convert to PDF with the configured office program
    ConvertPdf {
        filename: String,
        #[arg(long)]
        output: Option<String>,
    },
    /// Insert a heading next to an anchor
    InsertHeading {
        filename: String,
        text: String,
        #[arg(long, default_value_t = 1)]
        level: u8,
        #[command(flatten)]
        anchor: AnchorArgs,
    },
    /// Insert a paragraph next to an anchor
    InsertParagraph {
        filename: String,
        text: String,
        #[arg(long)]
        style: Option<String>,
        #[command(flatten)]
        anchor: AnchorArgs,
    },
    /// Insert a bulleted or numbered list next to an anchor
    InsertList {
        filename: String,
        #[arg(required = true)]
        items: Vec<String>,
        /// `bullet` or `number`
        #[arg(long, default_value = "bullet")]
        kind: String,
        #[arg(long, default_value_t = 1)]
        level: u8,
        #[command(flatten)]
        anchor: AnchorArgs,
    },
    /// Replace the section below a heading
    ReplaceBelowHeader {
        filename: String,
        header: String,
        paragraphs: Vec<String>,
        #[arg(long)]
        style: Option<String>,
    },
    /// Replace the content between two marker paragraphs
    ReplaceBetweenMarkers {
        filename: String,
        start_marker: String,
        #[arg(long)]
        end_marker: Option<String>,
        paragraphs: Vec<String>,
        #[arg(long)]
        style: Option<String>,
    },
    /// Add a footnote at the end of a paragraph
    AddFootnote { filename: String, paragraph_index: usize, text: String },
    /// Add an endnote at the end of a paragraph
    AddEndnote { filename: String, paragraph_index: usize, text: String },
    /// Add a footnote right after a text
    AddFootnoteAfter { filename: String, search: String, text: String },
    /// Add a footnote right before a text
    AddFootnoteBefore { filename: String, search: String, text: String },
    /// Move every footnote into the endnotes
    ConvertFootnotes { filename: String },
    /// List footnotes, or endnotes with `--endnotes`
    Notes {
        filename: String,
        #[arg(long)]
        endnotes: bool,
    },
    /// Restrict editing with a password
    Protect {
        filename: String,
        password: String,
        /// `readOnly`, `comments`, `trackedChanges` or `forms`
        #[arg(long, default_value = "readOnly")]
        restriction: String,
    },
    /// Remove password protection
    Unprotect { filename: String, password: String },
    /// Show the protection state
    VerifyProtection { filename: String },
    /// Record a content signature
    Sign { filename: String, signer: String },
    /// Check the content signature
    VerifySignature { filename: String },
    /// List comments, optionally filtered
    Comments {
        filename: String,
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        paragraph: Option<usize>,
    },
}

/// Split `a,b,c` rows into cells.
fn table_data(rows: &[String]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| row.split(',').map(|cell| cell.trim().to_string()).collect())
        .collect()
}

fn init_logging(config: &Config) {
    let mut builder = env_logger::Builder::from_default_env();
    if std::env::var_os("RUST_LOG").is_none() {
        builder.filter_level(config.logging.level_filter());
    }
    // A logger may already be installed when embedded.
    let _ = builder.try_init();
}

struct Outcome {
    message: String,
    failed: bool,
}

fn yaml<T: Serialize>(operation: &str, result: Result<T>) -> Outcome {
    let failed = result.is_err();
    Outcome {
        message: report_yaml(operation, result),
        failed,
    }
}

fn text<T: std::fmt::Display>(operation: &str, result: Result<T>) -> Outcome {
    let failed = result.is_err();
    Outcome {
        message: report_display(operation, result),
        failed,
    }
}

fn run(ws: &Workspace, command: Command) -> Outcome {
    match command {
        Command::Create { filename, title, author } => text(
            "create_document",
            ops::create_document(ws, &filename, title.as_deref(), author.as_deref())
                .map(|path| format!("Created {}", path.display())),
        ),
        Command::Build { filename, content } => {
            let result = std::fs::read_to_string(&content)
                .map_err(Error::from)
                .and_then(|yaml| DocumentContent::from_yaml(&yaml))
                .and_then(|content| ws.create_with_builder(&filename, &TemplateBuilder, &content))
                .map(|path| format!("Created {}", path.display()));
            text("build_document", result)
        },
        Command::List { directory } => yaml("list_documents", ops::list_documents(ws, directory.as_deref())),
        Command::Info { filename } => yaml("get_document_info", ops::get_document_info(ws, &filename)),
        Command::Outline { filename } => yaml("get_document_outline", ops::get_document_outline(ws, &filename)),
        Command::Text { filename } => text("get_document_text", ops::get_document_text(ws, &filename)),
        Command::Find { filename, text: needle, match_case, whole_word } => yaml(
            "find_text",
            ops::find_text(ws, &filename, &needle, MatchOptions { match_case, whole_word }),
        ),
        Command::Replace { filename, find, replace } => text(
            "search_and_replace",
            ops::search_and_replace(ws, &filename, &find, &replace)
                .map(|count| format!("Replaced {} occurrence(s)", count)),
        ),
        Command::AddParagraph { filename, text: body, style, format } => text(
            "add_paragraph",
            ops::add_paragraph(ws, &filename, &body, style.as_deref(), &RunFormat::from(&format))
                .map(|index| format!("Added paragraph {}", index)),
        ),
        Command::AddHeading { filename, text: body, level, border_bottom, format } => text(
            "add_heading",
            ops::add_heading(ws, &filename, &body, level, &RunFormat::from(&format), border_bottom)
                .map(|index| format!("Added heading at paragraph {}", index)),
        ),
        Command::AddTable { filename, rows, cols, data } => text(
            "add_table",
            ops::add_table(ws, &filename, rows, cols, &table_data(&data)).map(|index| format!("Added table {}", index)),
        ),
        Command::FormatText { filename, paragraph_index, start, end, format } => text(
            "format_text",
            ops::format_text(ws, &filename, paragraph_index, start, end, &RunFormat::from(&format))
                .map(|runs| format!("Formatted {} run(s)", runs)),
        ),
        Command::CreateStyle { filename, name, base_style, format } => text(
            "create_custom_style",
            ops::create_custom_style(ws, &filename, &name, &RunFormat::from(&format), base_style.as_deref())
                .map(|id| format!("Created style {}", id)),
        ),
        Command::ConvertPdf { filename, output } => {
            let converter = OfficeConverter::from_config(&ws.config().pdf);
            text(
                "convert_to_pdf",
                ops::convert_to_pdf(ws, &converter, &filename, output.as_deref())
                    .map(|path| format!("Converted to {}", path.display())),
            )
        },
        Command::InsertHeading { filename, text: body, level, anchor } => text(
            "insert_heading",
            anchor
                .position
                .parse::<Position>()
                .and_then(|position| ops::insert_heading(ws, &filename, &anchor.query(), &body, level, position))
                .map(|index| format!("Inserted heading at paragraph {}", index)),
        ),
        Command::InsertParagraph { filename, text: body, style, anchor } => text(
            "insert_paragraph",
            anchor
                .position
                .parse::<Position>()
                .and_then(|position| {
                    ops::insert_paragraph(ws, &filename, &anchor.query(), &body, style.as_deref(), position)
                })
                .map(|index| format!("Inserted paragraph at {}", index)),
        ),
        Command::InsertList { filename, items, kind, level, anchor } => {
            let result = kind.parse::<ListKind>().and_then(|kind| {
                let position = anchor.position.parse::<Position>()?;
                ops::insert_list(ws, &filename, &anchor.query(), &items, kind, level, position)
            });
            text("insert_list", result.map(|index| format!("Inserted list at paragraph {}", index)))
        },
        Command::ReplaceBelowHeader { filename, header, paragraphs, style } => yaml(
            "replace_below_header",
            ops::replace_below_header(ws, &filename, &header, &paragraphs, style.as_deref()),
        ),
        Command::ReplaceBetweenMarkers { filename, start_marker, end_marker, paragraphs, style } => yaml(
            "replace_between_markers",
            ops::replace_between_markers(
                ws,
                &filename,
                &start_marker,
                end_marker.as_deref(),
                &paragraphs,
                style.as_deref(),
            ),
        ),
        Command::AddFootnote { filename, paragraph_index, text: body } => text(
            "add_footnote",
            ops::add_footnote(ws, &filename, paragraph_index, &body).map(|id| format!("Added footnote {}", id)),
        ),
        Command::AddEndnote { filename, paragraph_index, text: body } => text(
            "add_endnote",
            ops::add_endnote(ws, &filename, paragraph_index, &body).map(|id| format!("Added endnote {}", id)),
        ),
        Command::AddFootnoteAfter { filename, search, text: body } => yaml(
            "add_footnote_after_text",
            ops::add_footnote_after_text(ws, &filename, &search, &body),
        ),
        Command::AddFootnoteBefore { filename, search, text: body } => yaml(
            "add_footnote_before_text",
            ops::add_footnote_before_text(ws, &filename, &search, &body),
        ),
        Command::ConvertFootnotes { filename } => yaml(
            "convert_footnotes_to_endnotes",
            ops::convert_footnotes_to_endnotes(ws, &filename),
        ),
        Command::Notes { filename, endnotes } => {
            let kind = if endnotes { NoteKind::Endnote } else { NoteKind::Footnote };
            yaml("list_notes", ops::list_notes(ws, &filename, kind))
        },
        Command::Protect { filename, password, restriction } => yaml(
            "protect_document",
            restriction
                .parse::<EditRestriction>()
                .and_then(|restriction| ops::protect_document(ws, &filename, &password, restriction)),
        ),
        Command::Unprotect { filename, password } => {
            yaml("unprotect_document", ops::unprotect_document(ws, &filename, &password))
        },
        Command::VerifyProtection { filename } => {
            yaml("verify_document_protection", ops::verify_document_protection(ws, &filename))
        },
        Command::Sign { filename, signer } => yaml("create_signature", ops::create_signature(ws, &filename, &signer)),
        Command::VerifySignature { filename } => yaml("verify_signature", ops::verify_signature(ws, &filename)),
        Command::Comments { filename, author, paragraph } => {
            let result = match (author, paragraph) {
                (Some(author), _) => ops::get_comments_by_author(ws, &filename, &author),
                (None, Some(index)) => ops::get_comments_for_paragraph(ws, &filename, index),
                (None, None) => ops::get_all_comments(ws, &filename),
            };
            yaml("get_comments", result)
        },
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::FAILURE;
        },
    };
    if let Some(dir) = cli.working_dir {
        config.working_dir = dir;
    }
    init_logging(&config);

    let ws = Workspace::new(config);
    let outcome = run(&ws, cli.command);
    if outcome.failed {
        eprintln!("{}", outcome.message);
        ExitCode::FAILURE
    } else {
        println!("{}", outcome.message.trim_end());
        ExitCode::SUCCESS
    }
}
