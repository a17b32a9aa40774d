use admindeck_application::{ColumnView, RowView};

const ID_HEADER: &str = "id";

/// Lays out rows as a plain-text table, one line per row.
pub fn render_table(columns: &[ColumnView], rows: &[RowView]) -> String {
    let mut lines: Vec<Vec<String>> = Vec::with_capacity(rows.len() + 1);
    lines.push(
        std::iter::once(ID_HEADER.to_owned())
            .chain(columns.iter().map(|column| column.label.clone()))
            .collect(),
    );
    for row in rows {
        lines.push(
            std::iter::once(row.record_id.clone().unwrap_or_default())
                .chain(row.cells.iter().map(|cell| single_line(&cell.text)))
                .collect(),
        );
    }

    let widths: Vec<usize> = (0..=columns.len())
        .map(|index| {
            lines
                .iter()
                .filter_map(|line| line.get(index))
                .map(|text| text.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    lines
        .iter()
        .map(|line| {
            line.iter()
                .zip(&widths)
                .map(|(text, width)| format!("{text:<width$}"))
                .collect::<Vec<_>>()
                .join(" | ")
                .trim_end()
                .to_owned()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
