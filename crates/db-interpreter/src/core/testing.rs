//! In-memory executor and progress sink for tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{InterpretError, Result};

use super::traits::{FeedbackInfo, ProgressSink, QueryExecutor};
use super::value::Row;

/// Answers queries by SQL substring and records every statement it sees.
#[derive(Debug, Default)]
pub(crate) struct MockExecutor {
    responses: Vec<(String, Vec<Row>)>,
    failures: Vec<String>,
    pub queries: Vec<String>,
    pub executed: Vec<String>,
    pub transaction_log: Vec<&'static str>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer queries containing `pattern` with `rows`. Earlier registrations
    /// win.
    pub fn respond(mut self, pattern: &str, rows: Vec<Row>) -> Self {
        self.responses.push((pattern.to_string(), rows));
        self
    }

    /// Fail any statement containing `pattern`.
    pub fn fail_on(mut self, pattern: &str) -> Self {
        self.failures.push(pattern.to_string());
        self
    }

    fn check_failure(&self, sql: &str) -> Result<()> {
        match self.failures.iter().find(|p| sql.contains(p.as_str())) {
            Some(p) => Err(InterpretError::execution(sql, format!("rejected by mock: {}", p))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl QueryExecutor for MockExecutor {
    async fn query(&mut self, sql: &str) -> Result<Vec<Row>> {
        self.queries.push(sql.to_string());
        self.check_failure(sql)?;
        Ok(self
            .responses
            .iter()
            .find(|(pattern, _)| sql.contains(pattern.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }

    async fn execute(&mut self, sql: &str) -> Result<u64> {
        self.check_failure(sql)?;
        self.executed.push(sql.to_string());
        Ok(1)
    }

    async fn begin_transaction(&mut self) -> Result<()> {
        self.transaction_log.push("begin");
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.transaction_log.push("commit");
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.transaction_log.push("rollback");
        Ok(())
    }
}

/// Records feedback in arrival order.
#[derive(Debug, Default)]
pub(crate) struct CollectingProgress {
    pub events: Mutex<Vec<FeedbackInfo>>,
}

impl CollectingProgress {
    pub fn events(&self) -> Vec<FeedbackInfo> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl ProgressSink for CollectingProgress {
    fn on_feedback(&self, info: &FeedbackInfo) {
        if let Ok(mut events) = self.events.lock() {
            events.push(info.clone());
        }
    }
}
