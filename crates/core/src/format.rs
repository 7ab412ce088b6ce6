// ==============================================================================
// Formatting pipeline: chain configured formatters, diff the result
// ==============================================================================
//
// Formatters are chained through stdin/stdout: each one consumes the previous
// one's output, so several tools can massage the same buffer without
// temporary files. A failing formatter is skipped (its error is recorded);
// only when every selected formatter fails does the request error out.

use lsp_types::{ProgressParams, Range, TextEdit, Url};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::mpsc::UnboundedSender;

use crate::command::run_format_command;
use crate::config::LanguageConfig;
use crate::diff::compute_edits;
use crate::document::FileRef;
use crate::engine::LangEngine;
use crate::error::{Error, Result};
use crate::placeholder::build_format_command;
use crate::progress::{new_progress_token, work_begin, work_end};
use crate::rootmarker::{effective_root, match_root_path};

/// Format the document behind `uri` through every matching config, in config
/// order, and return the line edits from the original buffer to the final
/// output. No matching config is not an error; the request just has nothing
/// to do.
pub async fn run_all_formatters(
    engine: &Mutex<LangEngine>,
    uri: &Url,
    range: Option<Range>,
    options: lsp_types::FormattingOptions,
    progress: UnboundedSender<ProgressParams>,
) -> Result<Vec<TextEdit>> {
    let (file, candidates, root_path) = {
        let engine = engine.lock();
        let file = engine.snapshot(uri)?;
        let candidates = engine.configs_for(&file.language_id);
        (file, candidates, engine.root_path.clone())
    };

    let configs = select_format_configs(&file.normalized_filename, candidates);
    if configs.is_empty() {
        log::debug!("no matching format configs for language {}", file.language_id);
        return Ok(Vec::new());
    }

    let options = flatten_options(&options);

    let token = new_progress_token();
    let _ = progress.send(work_begin(token.clone(), "Formatting document"));

    let mut formatted_text = file.text.clone();
    let mut formatted = false;
    let mut errors = Vec::new();

    for config in &configs {
        let root = effective_root(&file.normalized_filename, config, &root_path);
        match format_document(&root, &file, &formatted_text, range.as_ref(), &options, config).await
        {
            Ok(new_text) => {
                formatted = true;
                formatted_text = new_text;
            }
            Err(e) => {
                log::error!("{e}");
                errors.push(e.to_string());
            }
        }
    }

    if !formatted {
        return Err(Error::NoFormatterSucceeded {
            language_id: file.language_id.clone(),
            errors,
        });
    }

    log::info!("format succeeded for {uri}");
    let _ = progress.send(work_end(token));

    Ok(compute_edits(&file.text, &formatted_text))
}

/// One formatter over the current text. Takes the text explicitly rather
/// than re-reading the file ref so chained formatters see their
/// predecessor's output.
async fn format_document(
    root_path: &str,
    file: &FileRef,
    text_to_format: &str,
    range: Option<&Range>,
    options: &Map<String, Value>,
    config: &LanguageConfig,
) -> Result<String> {
    let command = build_format_command(
        &config.format_command,
        root_path,
        &file.normalized_filename,
        text_to_format,
        options,
        range,
    );

    log::info!("{command}");
    let output = run_format_command(&command, root_path, &config.env, text_to_format).await?;
    log::debug!("{output}");

    // Windows tools love emitting \r; the stored buffers never contain it.
    Ok(output.replace('\r', ""))
}

fn select_format_configs(filename: &str, candidates: Vec<LanguageConfig>) -> Vec<LanguageConfig> {
    candidates
        .into_iter()
        .filter(|config| {
            if config.format_command.is_empty() {
                return false;
            }
            !config.require_marker || match_root_path(filename, &config.root_markers).is_some()
        })
        .collect()
}

/// The LSP `FormattingOptions` struct flattened to a plain JSON map so
/// placeholder keys (`tabSize`, `insertSpaces`, client extensions) resolve
/// uniformly.
fn flatten_options(options: &lsp_types::FormattingOptions) -> Map<String, Value> {
    match serde_json::to_value(options) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}
