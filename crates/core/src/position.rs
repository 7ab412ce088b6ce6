// ==============================================================================
// Position utilities: byte offsets and UTF-16 word extraction
// ==============================================================================
//
// LSP positions are UTF-16 code units; range placeholders want byte offsets
// into the buffer. Both conversions clamp out-of-range input instead of
// failing, since editors routinely send positions one past the end.

use lsp_types::Position;

/// Byte offset of `(row, col)` in a buffer split on `\n`, counting one byte
/// per newline. Row is clamped into the line list, col into the line's byte
/// length.
pub fn convert_row_col_to_index(lines: &[&str], row: u32, col: u32) -> usize {
    if lines.is_empty() {
        return 0;
    }
    let row = (row as usize).min(lines.len() - 1);
    let col = (col as usize).min(lines[row].len());

    let mut index = 0;
    for line in &lines[..row] {
        index += line.len() + 1;
    }
    index + col
}

/// The run of same-class characters containing `position`, with
/// `position.character` counted in UTF-16 code units. Characters fall into
/// three classes, Vim-style: word (alphanumeric or `_`), whitespace, and
/// symbol. The whole run is returned even when the position sits inside it.
/// Empty when the position is past the end of its line.
pub fn word_at_utf16(text: &str, position: Position) -> String {
    let Some(line) = text.split('\n').nth(position.line as usize) else {
        return String::new();
    };

    let chars: Vec<char> = line.chars().collect();
    let mut utf16_offset: u32 = 0;
    let mut at = None;
    for (i, c) in chars.iter().enumerate() {
        if utf16_offset >= position.character {
            at = Some(i);
            break;
        }
        utf16_offset += c.len_utf16() as u32;
    }
    let Some(at) = at else {
        return String::new();
    };

    let class = char_class(chars[at]);
    let mut start = at;
    while start > 0 && char_class(chars[start - 1]) == class {
        start -= 1;
    }
    let mut end = at;
    while end < chars.len() && char_class(chars[end]) == class {
        end += 1;
    }
    chars[start..end].iter().collect()
}

/// Length of a string in UTF-16 code units (surrogate pairs count as two).
pub fn utf16_len(s: &str) -> usize {
    s.chars().map(char::len_utf16).sum()
}

#[derive(PartialEq, Clone, Copy)]
enum CharClass {
    Word,
    Space,
    Symbol,
}

fn char_class(c: char) -> CharClass {
    if c.is_alphanumeric() || c == '_' {
        CharClass::Word
    } else if c.is_whitespace() {
        CharClass::Space
    } else {
        CharClass::Symbol
    }
}
