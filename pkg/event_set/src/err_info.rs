use common::errors::*;
use common::failure::ResultExt;

use crate::error::EventSetError;
use crate::list::EventList;
use crate::record::{AppSite, Status};
use crate::runtime::{AsyncRuntime, DiagnosticStack};

/// A self-contained copy of everything known about one failed operation,
/// returned by `EventSet::get_err_info`. Ownership of every field transfers
/// to the caller; there is nothing left to release on the set's side once
/// this is handed back.
#[derive(Clone, Debug)]
pub struct ErrorInfo {
    pub api_name: String,
    pub app_file: String,
    pub app_func: String,
    pub app_line: u32,
    pub app_version: String,
    pub counter: u64,
    pub timestamp: u64,
    pub status: Status,
    pub diagnostics: DiagnosticStack,
}

/// Drains up to `max` records from `failed`, in insertion order, copying
/// each one's diagnostics and releasing its token. Clears `err_flag` only if
/// this call empties `failed` entirely.
pub(crate) fn drain<Token, R: AsyncRuntime<Token = Token>>(
    failed: &mut EventList<Token>,
    err_flag: &mut bool,
    runtime: &R,
    max: usize,
) -> Result<Vec<ErrorInfo>> {
    if max == 0 {
        return Err(EventSetError::BadValue.into());
    }

    let mut out = Vec::with_capacity(max.min(failed.len()));

    while out.len() < max {
        let id = match failed.head() {
            Some(id) => id,
            None => break,
        };

        // Snapshot before unlinking: if the runtime fails to produce
        // diagnostics, the record stays exactly where it was (still in
        // `failed`, still counted by `err_count`) instead of being lost.
        let diagnostics = {
            let record = failed.get(id);
            runtime
                .snapshot_diagnostics(&record.token)
                .context(EventSetError::CantGet)
                .with_context(|e| {
                    format_err!("extracting diagnostics for operation {}: {}", record.counter(), e)
                })?
        };

        let record = failed.remove(id);
        let AppSite { file, function, line } = record.app_site().clone();

        out.push(ErrorInfo {
            api_name: record.api_name().to_string(),
            app_file: file,
            app_func: function,
            app_line: line,
            app_version: record.app_version().to_string(),
            counter: record.counter(),
            timestamp: record.timestamp(),
            status: record.status(),
            diagnostics,
        });

        runtime.release(record.token);
    }

    if failed.is_empty() {
        *err_flag = false;
    }

    Ok(out)
}
