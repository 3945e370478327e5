use common::errors::*;

/// Outcome of polling a single operation's token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollResult {
    InProgress,
    Succeed,
    Fail,
    Cancel,
}

/// One frame of a diagnostic stack captured at the moment an operation
/// failed. Deliberately a plain owned string: no runtime type lookup, so it
/// stays trivially serializable and comparable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiagnosticFrame {
    pub message: String,
}

/// A deep copy of the diagnostic frames recorded for one failed operation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiagnosticStack {
    pub frames: Vec<DiagnosticFrame>,
}

impl DiagnosticStack {
    pub fn single(message: impl Into<String>) -> Self {
        Self {
            frames: vec![DiagnosticFrame {
                message: message.into(),
            }],
        }
    }
}

/// The asynchronous storage operation layer, as seen by the event set.
///
/// This is the one collaborator the wait engine blocks on; every other
/// entry point in this crate is non-blocking. A `Token` is opaque to the
/// event set: it is handed back to the same `AsyncRuntime` that issued it
/// and never inspected directly.
pub trait AsyncRuntime {
    type Token;

    /// Polls a token for its current status. `budget_ns` is a non-blocking
    /// check when zero; otherwise it is the most real time this call is
    /// permitted to consume.
    ///
    /// `Err` signals a structural failure of the runtime itself (e.g. the
    /// underlying wait syscall failed) rather than a per-operation failure;
    /// the wait engine surfaces that as `EventSetError::CantWait` instead of
    /// recording it against any one record.
    fn poll(&self, token: &mut Self::Token, budget_ns: u64) -> Result<PollResult>;

    /// Returns a deep copy of the diagnostic frames captured at the moment
    /// `token` failed. Only meaningful after `poll` returned `Fail` or
    /// `Cancel`. `Err` surfaces as `EventSetError::CantGet`.
    fn snapshot_diagnostics(&self, token: &Self::Token) -> Result<DiagnosticStack>;

    /// Idempotent teardown of a token. Called exactly once per token, either
    /// when the operation succeeds or after its diagnostics are extracted.
    fn release(&self, token: Self::Token);
}

/// An in-memory `AsyncRuntime` whose poll outcomes are scripted ahead of
/// time, the same way `pkg/executor/src/channel/oneshot.rs`'s test module
/// drives a channel's completion explicitly instead of waiting on real I/O.
#[cfg(test)]
pub(crate) mod fake {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::*;

    /// Opaque token handed out by `ScriptedRuntime`. The wrapped `u64` is an
    /// index into the runtime's script table, never interpreted by callers.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub(crate) struct FakeToken(u64);

    struct Script {
        steps: Vec<PollResult>,
        released: bool,
    }

    /// Each token's poll outcomes are a queue consumed one per call; the
    /// last entry repeats forever once the queue is down to one, so a
    /// runtime that "never completes" is expressed as `vec![InProgress]`.
    pub(crate) struct ScriptedRuntime {
        next_id: RefCell<u64>,
        scripts: RefCell<HashMap<u64, Script>>,
        poison_diagnostics: RefCell<bool>,
        block_on_poll: RefCell<bool>,
    }

    impl ScriptedRuntime {
        pub(crate) fn new() -> Self {
            Self {
                next_id: RefCell::new(0),
                scripts: RefCell::new(HashMap::new()),
                poison_diagnostics: RefCell::new(false),
                block_on_poll: RefCell::new(false),
            }
        }

        /// Makes every subsequent `snapshot_diagnostics` call fail, for
        /// exercising `EventSetError::CantGet`.
        pub(crate) fn poison_diagnostics(&self) {
            *self.poison_diagnostics.borrow_mut() = true;
        }

        /// Makes `poll` actually sleep for (a capped fraction of) the budget
        /// it is handed, the way a real blocking storage runtime would,
        /// instead of returning instantly. Used to prove the wait engine
        /// recomputes its shared budget between records in a sweep rather
        /// than handing every record the same stale snapshot.
        pub(crate) fn block_on_poll(&self) {
            *self.block_on_poll.borrow_mut() = true;
        }

        pub(crate) fn new_token(&self, steps: Vec<PollResult>) -> FakeToken {
            assert!(!steps.is_empty());
            let mut next_id = self.next_id.borrow_mut();
            let id = *next_id;
            *next_id += 1;

            self.scripts.borrow_mut().insert(
                id,
                Script {
                    steps,
                    released: false,
                },
            );
            FakeToken(id)
        }

        pub(crate) fn was_released(&self, token: FakeToken) -> bool {
            self.scripts.borrow()[&token.0].released
        }
    }

    impl AsyncRuntime for ScriptedRuntime {
        type Token = FakeToken;

        fn poll(&self, token: &mut Self::Token, budget_ns: u64) -> Result<PollResult> {
            if *self.block_on_poll.borrow() && budget_ns > 0 {
                // Cap at 50ms so a buggy caller that hands every record the
                // same un-decremented budget blows the test's time bound
                // without making a passing test slow.
                let sleep_ns = budget_ns.min(50_000_000);
                std::thread::sleep(std::time::Duration::from_nanos(sleep_ns));
            }

            let mut scripts = self.scripts.borrow_mut();
            let script = scripts.get_mut(&token.0).expect("unknown token polled");
            let result = if script.steps.len() > 1 {
                script.steps.remove(0)
            } else {
                script.steps[0]
            };
            Ok(result)
        }

        fn snapshot_diagnostics(&self, token: &Self::Token) -> Result<DiagnosticStack> {
            if *self.poison_diagnostics.borrow() {
                return Err(err_msg("diagnostics snapshot unavailable"));
            }

            Ok(DiagnosticStack::single(format!(
                "operation {} failed",
                token.0
            )))
        }

        fn release(&self, token: Self::Token) {
            self.scripts
                .borrow_mut()
                .get_mut(&token.0)
                .expect("unknown token released")
                .released = true;
        }
    }
}
