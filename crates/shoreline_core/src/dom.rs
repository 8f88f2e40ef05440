//! Helpers over `scraper` for walking status-page tables.
//!
//! The older firmware wedges an explanatory note table inside a data cell.
//! The tree is immutable once parsed, so instead of deleting nested tables
//! the walkers here filter by nearest ancestor: a row or cell counts only
//! for the table or row it directly belongs to.

use scraper::{ElementRef, Selector};

use crate::error::ModemError;

/// Compile a selector literal.
pub fn selector(css: &'static str) -> Result<Selector, ModemError> {
    Selector::parse(css).map_err(|_| ModemError::Selector(css.to_string()))
}

/// Concatenated text of every text node under `el`, in document order,
/// trimmed at the ends only. Interior whitespace is preserved so callers
/// can normalize per field (the multi-line modulation cell depends on it).
pub fn text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Like [`text`], but skipping anything inside a table nested under `cell`.
pub fn cell_text(cell: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in cell.descendants() {
        if let Some(t) = node.value().as_text() {
            let nested = node
                .ancestors()
                .take_while(|a| a.id() != cell.id())
                .filter_map(ElementRef::wrap)
                .any(|a| a.value().name() == "table");
            if !nested {
                out.push_str(t);
            }
        }
    }
    out.trim().to_string()
}

/// Rows belonging to `table` itself, excluding rows of nested tables.
pub fn direct_rows(table: ElementRef<'_>) -> Result<Vec<ElementRef<'_>>, ModemError> {
    let tr = selector("tr")?;
    Ok(table
        .select(&tr)
        .filter(|row| belongs_to(*row, "table", table))
        .collect())
}

/// Cells belonging to `row` itself, excluding cells of nested tables.
pub fn cells(row: ElementRef<'_>) -> Result<Vec<ElementRef<'_>>, ModemError> {
    let cell = selector("td, th")?;
    Ok(row
        .select(&cell)
        .filter(|c| belongs_to(*c, "tr", row))
        .collect())
}

/// True when `owner` is the nearest `tag` ancestor of `el`.
fn belongs_to(el: ElementRef<'_>, tag: &str, owner: ElementRef<'_>) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| a.value().name() == tag)
        .is_some_and(|a| a.id() == owner.id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn first_table(doc: &Html) -> ElementRef<'_> {
        let sel = selector("table").unwrap();
        doc.select(&sel).next().unwrap()
    }

    fn only_cell(doc: &Html) -> ElementRef<'_> {
        let sel = selector("td").unwrap();
        doc.select(&sel).next().unwrap()
    }

    #[test]
    fn test_text_concatenates_in_document_order() {
        let doc = Html::parse_document("<table><tr><td>  10 <b>dBmV</b> </td></tr></table>");
        assert_eq!(text(only_cell(&doc)), "10 dBmV");
    }

    #[test]
    fn test_text_preserves_interior_newlines() {
        let doc = Html::parse_document("<table><tr><td>[3] QPSK\n[3] 64QAM\n</td></tr></table>");
        assert_eq!(text(only_cell(&doc)), "[3] QPSK\n[3] 64QAM");
    }

    #[test]
    fn test_direct_rows_skip_nested_table() {
        let html = "<table>\
                    <tr><td>outer 1</td></tr>\
                    <tr><td><table><tr><td>note a</td></tr><tr><td>note b</td></tr></table></td></tr>\
                    </table>";
        let doc = Html::parse_document(html);
        let rows = direct_rows(first_table(&doc)).unwrap();
        assert_eq!(rows.len(), 2);
        let all_rows: usize = doc.select(&selector("tr").unwrap()).count();
        assert_eq!(all_rows, 4);
    }

    #[test]
    fn test_cells_skip_nested_table() {
        let html = "<table><tr>\
                    <td>value</td>\
                    <td><table><tr><td>nested</td></tr></table></td>\
                    </tr></table>";
        let doc = Html::parse_document(html);
        let rows = direct_rows(first_table(&doc)).unwrap();
        let row_cells = cells(rows[0]).unwrap();
        assert_eq!(row_cells.len(), 2);
        assert_eq!(text(row_cells[0]), "value");
    }

    #[test]
    fn test_cell_text_excludes_nested_table() {
        let html = "<table><tr>\
                    <td>10 dBmV<table><tr><td>reading is a snapshot</td></tr></table></td>\
                    </tr></table>";
        let doc = Html::parse_document(html);
        let rows = direct_rows(first_table(&doc)).unwrap();
        let row_cells = cells(rows[0]).unwrap();
        assert_eq!(cell_text(row_cells[0]), "10 dBmV");
        assert!(text(row_cells[0]).contains("snapshot"));
    }

    #[test]
    fn test_header_cells_count_as_cells() {
        let doc = Html::parse_document("<table><tr><th>Channel</th><td>1</td></tr></table>");
        let rows = direct_rows(first_table(&doc)).unwrap();
        assert_eq!(cells(rows[0]).unwrap().len(), 2);
    }
}
