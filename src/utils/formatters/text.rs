/// Aligned plain text table with bold headers and a separator rule.
pub struct TextFormatter<'a> {
    omit_fields: Vec<&'a str>,
    no_headers: bool,
    seperator: &'a str,
}

impl<'a> TextFormatter<'a> {
    pub fn new(omit_fields: Vec<&'a str>, no_headers: bool, seperator: &'a str) -> Self {
        Self {
            omit_fields,
            no_headers,
            seperator,
        }
    }

    fn render_row(&self, cells: &[&str], widths: &[usize], bold: bool) -> String {
        let mut line = String::new();
        for (i, (cell, width)) in cells.iter().zip(widths).enumerate() {
            if bold {
                line.push_str("\x1b[1m");
                line.push_str(cell);
                line.push_str("\x1b[0m");
            } else {
                line.push_str(cell);
            }
            if i != cells.len() - 1 {
                line.push_str(&" ".repeat(width - cell.len()));
                line.push_str(self.seperator);
            }
        }
        line
    }

    /// Every row must have one cell per header. No trailing newline.
    pub fn format<R: AsRef<str>>(&self, headers: &[&str], rows: &[Vec<R>]) -> String {
        let columns: Vec<usize> = headers
            .iter()
            .enumerate()
            .filter(|(_, header)| !self.omit_fields.contains(*header))
            .map(|(i, _)| i)
            .collect();

        let widths: Vec<usize> = columns
            .iter()
            .map(|&c| {
                rows.iter()
                    .map(|row| row[c].as_ref().len())
                    .fold(headers[c].len(), std::cmp::max)
            })
            .collect();

        let mut lines = Vec::with_capacity(rows.len() + 2);
        if !self.no_headers && !columns.is_empty() {
            let cells: Vec<&str> = columns.iter().map(|&c| headers[c]).collect();
            lines.push(self.render_row(&cells, &widths, true));
            let rule_len =
                widths.iter().sum::<usize>() + (columns.len() - 1) * self.seperator.len();
            lines.push("-".repeat(rule_len));
        }
        for row in rows {
            let cells: Vec<&str> = columns.iter().map(|&c| row[c].as_ref()).collect();
            lines.push(self.render_row(&cells, &widths, false));
        }
        lines.join("\n")
    }
}
