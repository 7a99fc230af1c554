use super::ExtractionError;
use docx_rs::{
    DocumentChild, Paragraph, ParagraphChild, RunChild, Table, TableCellContent, TableChild,
    TableRowChild,
};

/// Collect paragraph text, then table cell text, one non-empty line each.
pub(super) fn extract(content: &[u8]) -> Result<String, ExtractionError> {
    let docx =
        docx_rs::read_docx(content).map_err(|error| ExtractionError::Docx(error.to_string()))?;

    let mut paragraphs = Vec::new();
    let mut cells = Vec::new();
    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(paragraph) => {
                push_non_empty(&mut paragraphs, paragraph_text(paragraph))
            }
            DocumentChild::Table(table) => collect_cells(table, &mut cells),
            _ => {}
        }
    }

    paragraphs.extend(cells);
    Ok(paragraphs.join("\n"))
}

#[allow(irrefutable_let_patterns)]
fn collect_cells(table: &Table, out: &mut Vec<String>) {
    for row in &table.rows {
        let TableChild::TableRow(row) = row else {
            continue;
        };
        for cell in &row.cells {
            let TableRowChild::TableCell(cell) = cell else {
                continue;
            };
            let text = cell
                .children
                .iter()
                .filter_map(|content| match content {
                    TableCellContent::Paragraph(paragraph) => Some(paragraph_text(paragraph)),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n");
            push_non_empty(out, text);
        }
    }
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut text = String::new();
    for child in &paragraph.children {
        if let ParagraphChild::Run(run) = child {
            for run_child in &run.children {
                match run_child {
                    RunChild::Text(t) => text.push_str(&t.text),
                    RunChild::Tab(_) => text.push('\t'),
                    _ => {}
                }
            }
        }
    }
    text
}

fn push_non_empty(out: &mut Vec<String>, text: String) {
    if !text.trim().is_empty() {
        out.push(text);
    }
}
