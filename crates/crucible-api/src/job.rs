//! Context for scheduled-task functions.

use crate::context::FunctionContext;
use crate::object::Session;

/// Default upper bound for a single log entry, in characters.
///
/// Oversized entries are truncated with a trailing ellipsis before they
/// reach the run log. Intentional policy, not a bug; adjust per context
/// with [`JobContext::with_log_limit`].
pub const DEFAULT_LOG_LIMIT: usize = 1024;

/// Severity of a job log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

/// One entry in a task run log.
#[derive(Debug, Clone)]
pub struct JobLogEntry {
    pub level: LogLevel,
    pub content: String,
}

/// A named parameter of a task run.
#[derive(Debug, Clone)]
pub struct JobParameter {
    pub name: String,
    pub value: String,
}

/// Context for scheduled-task functions.
///
/// Carries the run's named parameters and collects the log entries the
/// task body emits; the task runner persists them after the run.
#[derive(Debug)]
pub struct JobContext {
    base: FunctionContext,
    parameters: Vec<JobParameter>,
    logs: Vec<JobLogEntry>,
    log_limit: usize,
}

impl JobContext {
    /// Create a job context for one task run.
    pub fn new(base: FunctionContext, parameters: Vec<JobParameter>) -> Self {
        Self {
            base,
            parameters,
            logs: Vec::new(),
            log_limit: DEFAULT_LOG_LIMIT,
        }
    }

    /// Override the per-entry log size limit.
    pub fn with_log_limit(mut self, limit: usize) -> Self {
        self.log_limit = limit;
        self
    }

    /// The transactional session for this run.
    pub fn session(&self) -> &Session {
        self.base.session()
    }

    /// The owning module scope, if any.
    pub fn module(&self) -> Option<&str> {
        self.base.module()
    }

    /// Look up a run parameter by name, case-insensitively.
    pub fn job_parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|param| param.name.eq_ignore_ascii_case(name))
            .map(|param| param.value.as_str())
    }

    /// Look up a run parameter, falling back to a default.
    pub fn job_parameter_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.job_parameter(name).unwrap_or(default)
    }

    /// Whether a run parameter is present.
    pub fn has_job_parameter(&self, name: &str) -> bool {
        self.job_parameter(name).is_some()
    }

    /// Log an informational entry.
    pub fn log_info(&mut self, content: &str) {
        self.log(LogLevel::Info, content);
    }

    /// Log a warning entry.
    pub fn log_warning(&mut self, content: &str) {
        self.log(LogLevel::Warning, content);
    }

    /// Log an error entry.
    pub fn log_error(&mut self, content: &str) {
        self.log(LogLevel::Error, content);
    }

    /// Entries logged so far.
    pub fn logs(&self) -> &[JobLogEntry] {
        &self.logs
    }

    /// Drain the collected log entries.
    pub fn take_logs(&mut self) -> Vec<JobLogEntry> {
        std::mem::take(&mut self.logs)
    }

    fn log(&mut self, level: LogLevel, content: &str) {
        let content = truncate(content, self.log_limit);
        self.logs.push(JobLogEntry { level, content });
    }
}

/// Replace the tail of over-limit `content` with an ellipsis. The result
/// stays strictly under `limit` characters.
fn truncate(content: &str, limit: usize) -> String {
    if content.chars().count() <= limit {
        return content.to_string();
    }
    let keep = limit.saturating_sub(4);
    let mut truncated: String = content.chars().take(keep).collect();
    truncated.push_str("...");
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_with(params: Vec<JobParameter>) -> JobContext {
        let base = FunctionContext::new(Session::new(1), None);
        JobContext::new(base, params)
    }

    #[test]
    fn parameter_lookup_is_case_insensitive() {
        let ctx = context_with(vec![JobParameter {
            name: "BatchSize".into(),
            value: "50".into(),
        }]);

        assert_eq!(ctx.job_parameter("batchsize"), Some("50"));
        assert_eq!(ctx.job_parameter("BATCHSIZE"), Some("50"));
        assert_eq!(ctx.job_parameter("missing"), None);
        assert_eq!(ctx.job_parameter_or("missing", "10"), "10");
        assert!(ctx.has_job_parameter("batchSize"));
    }

    #[test]
    fn long_entries_are_truncated_with_ellipsis() {
        let mut ctx = context_with(Vec::new());
        ctx.log_info(&"x".repeat(2000));

        let entry = &ctx.logs()[0];
        assert_eq!(entry.content.chars().count(), DEFAULT_LOG_LIMIT - 1);
        assert!(entry.content.ends_with("..."));
    }

    #[test]
    fn short_entries_are_kept_verbatim() {
        let mut ctx = context_with(Vec::new());
        ctx.log_warning("low stock");

        let entry = &ctx.logs()[0];
        assert_eq!(entry.level, LogLevel::Warning);
        assert_eq!(entry.content, "low stock");
    }

    #[test]
    fn custom_limit_applies() {
        let base = FunctionContext::new(Session::new(1), None);
        let mut ctx = JobContext::new(base, Vec::new()).with_log_limit(10);
        ctx.log_error("0123456789abcdef");

        assert_eq!(ctx.logs()[0].content, "012345...");
    }

    #[test]
    fn take_logs_drains() {
        let mut ctx = context_with(Vec::new());
        ctx.log_info("one");
        ctx.log_info("two");

        let logs = ctx.take_logs();
        assert_eq!(logs.len(), 2);
        assert!(ctx.logs().is_empty());
    }
}
