// ==============================================================================
// Command template expansion
// ==============================================================================
//
// Three fixed passes, in order: magic strings, `${flag:key}` options,
// `${flag=key}` options (ranges reuse the option passes over a synthetic
// map). Single-pass expansion is not possible: a filename substituted by the
// first pass may itself contain `${`, and must not be re-interpreted by the
// later passes' regexes. Unfilled placeholders are stripped at the end.

use std::sync::LazyLock;

use lsp_types::Range;
use regex::{Captures, Regex};
use serde_json::{Map, Value};

use crate::config::LanguageConfig;
use crate::position::convert_row_col_to_index;

pub const INPUT_PLACEHOLDER: &str = "${INPUT}";
const FILENAME_PLACEHOLDER: &str = "${FILENAME}";
const FILEEXT_PLACEHOLDER: &str = "${FILEEXT}";
const ROOT_PLACEHOLDER: &str = "${ROOT}";

static RE_UNFILLED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{[^}]*\}").unwrap());
// ${--flag:opt}
static RE_COLON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^:}]+):([^}]+)\}").unwrap());
// ${--flag=opt}
static RE_EQUALS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^=}]+)=([^}]+)\}").unwrap());

/// Literal replacement of `${INPUT}`, `${FILENAME}`, `${FILEEXT}` and
/// `${ROOT}`. Paths get `(`/`)` escaped because the result is handed to a
/// shell.
pub fn replace_magic_strings(command: &str, filename: &str, root_path: &str) -> String {
    command
        .replace(INPUT_PLACEHOLDER, &escape_parens(filename))
        .replace(FILEEXT_PLACEHOLDER, file_extension(filename))
        .replace(FILENAME_PLACEHOLDER, &escape_parens(filename))
        .replace(ROOT_PLACEHOLDER, &escape_parens(root_path))
}

/// Everything after the last dot of the final path component, without the
/// dot. Unlike `Path::extension`, a leading dot counts as the boundary, so a
/// dotfile like `.bashrc` reports `bashrc`; tools keyed on extension expect
/// that.
fn file_extension(filename: &str) -> &str {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    match name.rfind('.') {
        Some(dot) => &name[dot + 1..],
        None => "",
    }
}

/// Resolve `${flag:key}` and `${flag=key}` against an options map.
///
/// An absent key keeps the placeholder (a later pass or the final strip deals
/// with it). A bool value emits just the flag when it agrees with the
/// (possibly `!`-negated) key, else nothing. Any other value emits
/// `flag<sep>value`; negating a non-bool emits nothing.
pub fn apply_options_placeholders(command: &str, options: &Map<String, Value>) -> String {
    let command = RE_COLON.replace_all(command, |caps: &Captures| {
        resolve_option(caps, options, " ")
    });
    let command = RE_EQUALS.replace_all(&command, |caps: &Captures| {
        resolve_option(caps, options, "=")
    });
    command.trim().to_string()
}

fn resolve_option(caps: &Captures, options: &Map<String, Value>, sep: &str) -> String {
    let flag = &caps[1];
    let opt = &caps[2];

    let negated = opt.starts_with('!');
    let key = opt.trim_start_matches('!');

    let Some(value) = options.get(key) else {
        return caps[0].to_string();
    };

    match value {
        Value::Bool(b) => {
            if *b == !negated {
                flag.to_string()
            } else {
                String::new()
            }
        }
        _ if negated => String::new(),
        Value::String(s) => format!("{flag}{sep}{s}"),
        other => format!("{flag}{sep}{other}"),
    }
}

/// Range placeholders resolve over a synthetic map; char offsets are byte
/// indices into the text being formatted, so range-capable formatters can be
/// given `--start-offset`-style flags.
pub fn apply_range_placeholders(command: &str, range: &Range, text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let char_start = convert_row_col_to_index(&lines, range.start.line, range.start.character);
    let char_end = convert_row_col_to_index(&lines, range.end.line, range.end.character);

    let mut options = Map::new();
    options.insert("charStart".into(), char_start.into());
    options.insert("charEnd".into(), char_end.into());
    options.insert("rowStart".into(), range.start.line.into());
    options.insert("colStart".into(), range.start.character.into());
    options.insert("rowEnd".into(), range.end.line.into());
    options.insert("colEnd".into(), range.end.character.into());

    apply_options_placeholders(command, &options)
}

/// Full expansion for a formatter template.
pub fn build_format_command(
    command: &str,
    root_path: &str,
    filename: &str,
    text_to_format: &str,
    options: &Map<String, Value>,
    range: Option<&Range>,
) -> String {
    let command = replace_magic_strings(command, filename, root_path);
    let command = apply_options_placeholders(&command, options);
    let command = match range {
        Some(range) => apply_range_placeholders(&command, range, text_to_format),
        None => command,
    };
    RE_UNFILLED.replace_all(&command, "").trim().to_string()
}

/// Lint templates only get the magic-string pass; when the linter reads the
/// file itself (no stdin) and the template forgot `${INPUT}`, it is appended.
pub fn build_lint_command(config: &LanguageConfig, filename: &str, root_path: &str) -> String {
    let mut command = config.lint_command.clone();
    if !config.lint_stdin && !command.contains(INPUT_PLACEHOLDER) {
        command.push(' ');
        command.push_str(INPUT_PLACEHOLDER);
    }
    replace_magic_strings(&command, filename, root_path)
}

fn escape_parens(path: &str) -> String {
    path.replace('(', "\\(").replace(')', "\\)")
}
