/// Where, in the caller's code, an operation was enqueued.
///
/// Owned strings rather than `&'static str`: the caller issuing the
/// operation may be a dynamically loaded wrapper library whose site strings
/// cannot be assumed to outlive the record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppSite {
    pub file: String,
    pub function: String,
    pub line: u32,
}

impl AppSite {
    pub fn new(file: impl Into<String>, function: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            function: function.into(),
            line,
        }
    }
}

/// Lifecycle state of one operation record.
///
/// `Succeed` is a transient value: the wait engine assigns it only long
/// enough to decide the record should be freed, and it is never observable
/// through any public accessor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    InProgress,
    Succeed,
    Fail,
    Cancel,
}

/// An immutable-after-submission descriptor for one in-flight (or just
/// completed) asynchronous operation.
///
/// Every field except `status` is fixed at construction; `status` and list
/// membership are the only things the wait engine ever mutates.
pub struct OperationRecord<Token> {
    pub(crate) counter: u64,
    pub(crate) api_name: String,
    pub(crate) app_site: AppSite,
    pub(crate) app_version: String,
    pub(crate) timestamp: u64,
    pub(crate) token: Token,
    pub(crate) status: Status,
}

impl<Token> OperationRecord<Token> {
    pub(crate) fn new(
        counter: u64,
        api_name: String,
        app_site: AppSite,
        app_version: String,
        timestamp: u64,
        token: Token,
    ) -> Self {
        Self {
            counter,
            api_name,
            app_site,
            app_version,
            timestamp,
            token,
            status: Status::InProgress,
        }
    }

    pub fn counter(&self) -> u64 {
        self.counter
    }

    pub fn api_name(&self) -> &str {
        &self.api_name
    }

    pub fn app_site(&self) -> &AppSite {
        &self.app_site
    }

    pub fn app_version(&self) -> &str {
        &self.app_version
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn status(&self) -> Status {
        self.status
    }
}
