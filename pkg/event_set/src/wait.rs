use std::thread::sleep;
use std::time::Duration;

use common::errors::*;
use common::failure::ResultExt;

use crate::clock::Budget;
use crate::error::EventSetError;
use crate::event_set::SetCallbacks;
use crate::list::{Disposition, EventList};
use crate::record::Status;
use crate::runtime::{AsyncRuntime, PollResult};

/// Outcome of one `EventSet::wait` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaitOutcome {
    /// Number of records still `IN_PROGRESS` when `wait` stopped. When it
    /// stopped due to fast-fail, this may already be stale: later sweeps
    /// would likely shrink it further.
    pub num_in_progress: usize,

    /// Whether any operation in this set has failed and not yet been fully
    /// drained via `get_err_info`. Set even if nothing failed on this exact
    /// call, as long as earlier failures are still sitting undrained.
    pub op_failed: bool,
}

/// Pace between sweeps that made no progress, so a runtime that only makes
/// progress when re-polled doesn't turn `wait` into a busy spin. Mirrors the
/// small-sleep-then-retry idiom in `pkg/executor/src/loop_throttler.rs`.
const POLL_INTERVAL_NS: u64 = 1_000_000;

/// Drives the active list to one of the three documented stop conditions:
/// it empties, a sweep observes a failure (fast-fail), or the budget runs
/// out without any record completing.
pub(crate) fn run<Token, R, C>(
    active: &mut EventList<Token>,
    failed: &mut EventList<Token>,
    err_flag: &mut bool,
    callbacks: &mut C,
    runtime: &R,
    timeout_ns: u64,
) -> Result<WaitOutcome>
where
    R: AsyncRuntime<Token = Token>,
    C: SetCallbacks,
{
    let budget = Budget::start(timeout_ns);
    let mut any_failed = false;

    loop {
        let mut progressed = false;
        let mut sweep_err: Option<Error> = None;

        active.iter_with_remove(|active, id| {
            if sweep_err.is_some() {
                return Disposition::Stop;
            }

            // Recomputed for every record: the budget is shared across the
            // whole sweep, not handed out per-operation, so a record polled
            // later in the same sweep must see what earlier polls in this
            // sweep already spent.
            let remaining = budget.remaining();
            let poll_result = {
                let record = active.get_mut(id);
                runtime.poll(&mut record.token, remaining)
            };
            let poll_result = match poll_result.context(EventSetError::CantWait) {
                Ok(r) => r,
                Err(e) => {
                    sweep_err = Some(e.into());
                    return Disposition::Stop;
                }
            };

            match poll_result {
                PollResult::InProgress => Disposition::Keep,
                PollResult::Succeed => {
                    let record = active.remove(id);
                    progressed = true;

                    if let Err(e) = callbacks.on_complete(
                        record.api_name(),
                        record.app_site(),
                        record.app_version(),
                        record.counter(),
                        record.timestamp(),
                        Status::Succeed,
                    ) {
                        eprintln!("event_set: on_complete callback failed: {}", e);
                    }

                    runtime.release(record.token);
                    Disposition::Unlinked
                }
                PollResult::Fail | PollResult::Cancel => {
                    let mut record = active.remove(id);
                    record.status = if poll_result == PollResult::Fail {
                        Status::Fail
                    } else {
                        Status::Cancel
                    };
                    let status = record.status;

                    *err_flag = true;
                    any_failed = true;

                    let failed_id = failed.append(record);
                    let rec = failed.get(failed_id);
                    if let Err(e) = callbacks.on_complete(
                        rec.api_name(),
                        rec.app_site(),
                        rec.app_version(),
                        rec.counter(),
                        rec.timestamp(),
                        status,
                    ) {
                        eprintln!("event_set: on_complete callback failed: {}", e);
                    }
                    Disposition::Unlinked
                }
            }
        });

        if let Some(e) = sweep_err {
            return Err(e);
        }

        if any_failed {
            break;
        }
        if active.is_empty() {
            break;
        }

        let remaining = budget.remaining();
        if remaining == 0 && !progressed {
            break;
        }

        if !progressed {
            sleep(Duration::from_nanos(remaining.min(POLL_INTERVAL_NS)));
        }
    }

    Ok(WaitOutcome {
        num_in_progress: active.len(),
        op_failed: any_failed || (*err_flag && !failed.is_empty()),
    })
}
