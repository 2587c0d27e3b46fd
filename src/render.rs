use crate::types::StockBar;

const MAX_WIDTH: f64 = 72.0;

/// Draws one bar as a strip of labelled segments, offcut hatched with `/`.
pub fn render_bar(capacity: f64, bar: &StockBar) -> String {
    let scale = MAX_WIDTH / capacity;

    let mut segments: Vec<(usize, String, char)> = bar
        .pieces
        .iter()
        .map(|&p| (((p * scale).round() as usize).max(1), format!("{:.2}", p), ' '))
        .collect();

    let offcut = ((bar.waste(capacity) * scale).round() as usize).min(MAX_WIDTH as usize);
    if offcut > 0 {
        segments.push((offcut, String::new(), '/'));
    }
    if segments.is_empty() {
        return String::new();
    }

    let mut edge = String::from("+");
    let mut body = String::from("|");
    for (width, label, fill) in &segments {
        edge.push_str(&"-".repeat(*width));
        edge.push('+');
        body.push_str(&fill_segment(*width, label, *fill));
        body.push('|');
    }

    format!("{edge}\n{body}\n{edge}\n")
}

fn fill_segment(width: usize, label: &str, fill: char) -> String {
    let len = label.chars().count();
    if len == 0 || len > width {
        return fill.to_string().repeat(width);
    }
    let left = (width - len) / 2;
    let right = width - len - left;
    format!(
        "{}{}{}",
        fill.to_string().repeat(left),
        label,
        fill.to_string().repeat(right)
    )
}
