// ==============================================================================
// Line-granular edit script between two buffers
// ==============================================================================
//
// Formatters return a whole new buffer; clients want minimal edits so the
// cursor and folds survive. Lines are diffed with Myers (the `similar`
// crate) and adjacent non-equal hunks are coalesced into one replacement.
//
// Every edit range starts and ends at character 0 of some line; pure
// insertions are zero-width. The inputs may or may not end in a newline;
// splitting is done with `split_inclusive`, so the final line keeps whatever
// terminator it has.

use lsp_types::{Position, Range, TextEdit};
use similar::{DiffOp, TextDiff};

/// Compute edits that turn `before` into `after`. Equal inputs produce an
/// empty list. The result is sorted and non-overlapping.
pub fn compute_edits(before: &str, after: &str) -> Vec<TextEdit> {
    if before == after {
        return Vec::new();
    }

    let before_lines: Vec<&str> = before.split_inclusive('\n').collect();
    let after_lines: Vec<&str> = after.split_inclusive('\n').collect();
    let diff = TextDiff::from_slices(&before_lines, &after_lines);

    let mut edits = Vec::new();
    // Pending hunk: (old start, old end, new start, new end), merged across
    // directly adjacent delete/insert/replace ops.
    let mut pending: Option<(usize, usize, usize, usize)> = None;

    for op in diff.ops() {
        let (old_range, new_range) = match op {
            DiffOp::Equal { .. } => {
                if let Some(hunk) = pending.take() {
                    edits.push(edit_for(hunk, &after_lines));
                }
                continue;
            }
            DiffOp::Delete {
                old_index,
                old_len,
                new_index,
            } => (*old_index..old_index + old_len, *new_index..*new_index),
            DiffOp::Insert {
                old_index,
                new_index,
                new_len,
            } => (*old_index..*old_index, *new_index..new_index + new_len),
            DiffOp::Replace {
                old_index,
                old_len,
                new_index,
                new_len,
            } => (*old_index..old_index + old_len, *new_index..new_index + new_len),
        };

        pending = Some(match pending {
            Some((old_start, _, new_start, _)) => {
                (old_start, old_range.end, new_start, new_range.end)
            }
            None => (old_range.start, old_range.end, new_range.start, new_range.end),
        });
    }
    if let Some(hunk) = pending {
        edits.push(edit_for(hunk, &after_lines));
    }

    edits
}

fn edit_for(
    (old_start, old_end, new_start, new_end): (usize, usize, usize, usize),
    after_lines: &[&str],
) -> TextEdit {
    TextEdit {
        range: Range::new(
            Position::new(old_start as u32, 0),
            Position::new(old_end as u32, 0),
        ),
        new_text: after_lines[new_start..new_end].concat(),
    }
}

#[cfg(test)]
pub(crate) fn apply_edits(text: &str, edits: &[TextEdit]) -> String {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    let mut result = String::new();
    let mut next_line = 0usize;

    for edit in edits {
        let start = edit.range.start.line as usize;
        let end = edit.range.end.line as usize;
        for line in &lines[next_line..start.min(lines.len())] {
            result.push_str(line);
        }
        result.push_str(&edit.new_text);
        next_line = end;
    }
    for line in &lines[next_line.min(lines.len())..] {
        result.push_str(line);
    }
    result
}
