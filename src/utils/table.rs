/// A plain text table for terminal summaries
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    col_widths: Vec<usize>,
}

/// Display width of a cell; CJK characters take two columns
fn cell_width(text: &str) -> usize {
    text.chars()
        .map(|c| if (c as u32) >= 0x2E80 { 2 } else { 1 })
        .sum()
}

impl Table {
    /// Create a new table with the given headers
    pub fn new(headers: Vec<&str>) -> Self {
        let col_widths = headers.iter().map(|h| cell_width(h)).collect();
        let headers = headers.iter().map(|h| h.to_string()).collect();
        Table {
            headers,
            rows: Vec::new(),
            col_widths,
        }
    }

    /// Add a row to the table. Cells past the header count are dropped.
    pub fn add_row(&mut self, row: Vec<String>) {
        let row: Vec<String> = row.into_iter().take(self.headers.len()).collect();
        for (i, col) in row.iter().enumerate() {
            self.col_widths[i] = self.col_widths[i].max(cell_width(col));
        }
        self.rows.push(row);
    }

    pub fn render(&self) -> String {
        let mut output = String::new();
        output.push_str(&self.render_row(&self.headers));
        output.push('\n');
        output.push_str(&self.render_separator());
        output.push('\n');
        for row in &self.rows {
            output.push_str(&self.render_row(row));
            output.push('\n');
        }
        output
    }

    fn render_row(&self, row: &[String]) -> String {
        let cells: Vec<String> = self
            .col_widths
            .iter()
            .enumerate()
            .map(|(i, &width)| {
                let text = row.get(i).map(String::as_str).unwrap_or("");
                let pad = width.saturating_sub(cell_width(text));
                format!("{}{}", text, " ".repeat(pad))
            })
            .collect();
        cells.join(" | ").trim_end().to_string()
    }

    fn render_separator(&self) -> String {
        self.col_widths
            .iter()
            .map(|&w| "-".repeat(w))
            .collect::<Vec<_>>()
            .join("-+-")
    }
}
