/// One (url, label) unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub url: String,
    pub label: String,
}

impl WorkItem {
    pub fn new(url: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            label: label.into(),
        }
    }
}

/// Parse CSV text into work items: first column is the url, second the label.
///
/// Rows with fewer than two non-empty fields are dropped. With `has_header` the
/// first non-blank line is skipped unconditionally.
pub fn parse_work_items(raw: &str, has_header: bool) -> Vec<WorkItem> {
    raw.lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .skip(usize::from(has_header))
        .filter_map(|line| {
            let mut fields = split_record(line).into_iter();
            let url = fields.next()?.trim().to_string();
            let label = fields.next()?.trim().to_string();
            if url.is_empty() || label.is_empty() {
                return None;
            }
            Some(WorkItem { url, label })
        })
        .collect()
}

/// Split one CSV line, honouring double quotes and `""` escapes.
fn split_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if current.trim().is_empty() => {
                current.clear();
                in_quotes = true;
            }
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}
