// ==============================================================================
// Property-based tests for the ∀-invariants
// ==============================================================================
//
// The diff contract ("applying the edits reproduces the target, edits are
// sorted and line-granular") has to hold for arbitrary buffers, including
// the awkward ones: empty, no trailing newline, repeated lines. Same idea
// for placeholder expansion, which must be total over arbitrary templates.

use proptest::prelude::*;

use crate::diff::{apply_edits, compute_edits};
use crate::placeholder::build_format_command;

/// Buffers built from a tiny alphabet so that lines repeat; repeated lines
/// are where a line diff earns its keep.
fn arb_buffer() -> impl Strategy<Value = String> {
    (
        prop::collection::vec("[abc]{0,3}", 0..12),
        prop::bool::ANY,
    )
        .prop_map(|(lines, trailing_newline)| {
            let mut text = lines.join("\n");
            if trailing_newline && !text.is_empty() {
                text.push('\n');
            }
            text
        })
}

proptest! {
    #[test]
    fn diff_round_trips(before in arb_buffer(), after in arb_buffer()) {
        let edits = compute_edits(&before, &after);
        prop_assert_eq!(apply_edits(&before, &edits), after);
    }

    #[test]
    fn diff_edits_are_sorted_and_line_granular(before in arb_buffer(), after in arb_buffer()) {
        let edits = compute_edits(&before, &after);
        for edit in &edits {
            prop_assert_eq!(edit.range.start.character, 0);
            prop_assert_eq!(edit.range.end.character, 0);
            prop_assert!(edit.range.start <= edit.range.end);
        }
        for window in edits.windows(2) {
            prop_assert!(window[0].range.end <= window[1].range.start);
        }
    }

    #[test]
    fn diff_of_equal_buffers_is_empty(text in arb_buffer()) {
        prop_assert!(compute_edits(&text, &text).is_empty());
    }

    #[test]
    fn format_command_expansion_is_total(
        template in "[ -~]{0,40}",
        filename in "/[a-z]{1,8}/[a-z]{1,8}\\.[a-z]{1,3}",
    ) {
        let options = serde_json::Map::new();
        let command = build_format_command(&template, "/root", &filename, "text", &options, None);
        // Expansion never panics and always trims. (Stripping a placeholder
        // can reveal a new `${...}` assembled from surrounding text, so "no
        // placeholder survives" is deliberately not asserted.)
        prop_assert_eq!(command.trim(), command.as_str());
    }
}
