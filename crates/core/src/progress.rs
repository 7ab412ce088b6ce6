// ==============================================================================
// $/progress payload helpers
// ==============================================================================

use lsp_types::{
    NumberOrString, ProgressParams, ProgressParamsValue, ProgressToken, WorkDoneProgress,
    WorkDoneProgressBegin, WorkDoneProgressEnd,
};

/// Fresh token for one begin/end pair. UUIDs keep concurrent runs apart
/// without any coordination.
pub fn new_progress_token() -> ProgressToken {
    NumberOrString::String(uuid::Uuid::new_v4().to_string())
}

pub fn work_begin(token: ProgressToken, title: &str) -> ProgressParams {
    ProgressParams {
        token,
        value: ProgressParamsValue::WorkDone(WorkDoneProgress::Begin(WorkDoneProgressBegin {
            title: title.to_string(),
            cancellable: None,
            message: None,
            percentage: None,
        })),
    }
}

pub fn work_end(token: ProgressToken) -> ProgressParams {
    ProgressParams {
        token,
        value: ProgressParamsValue::WorkDone(WorkDoneProgress::End(WorkDoneProgressEnd {
            message: None,
        })),
    }
}
