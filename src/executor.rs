//! The bridge to the external query backend.
//!
//! The backend itself is a collaborator: anything implementing
//! `QueryExecutor` can sit on the far side. The bridge runs it on a worker
//! thread and talks to the UI over mpsc channels, so the event loop only
//! ever polls. UPDATE batches execute strictly sequentially and abort on
//! the first failure, leaving a well-defined committed prefix.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use crate::resultset::{CellValue, ColumnMeta, ResultSet};

pub trait QueryExecutor: Send {
    /// Run one statement that is expected to produce rows.
    fn run_query(&mut self, sql: &str, database: &str) -> Result<ResultSet, String>;

    /// Run one statement for effect only (the UPDATEs of a save batch).
    fn run_statement(&mut self, sql: &str, database: &str) -> Result<(), String>;
}

#[derive(Debug)]
pub enum BridgeRequest {
    /// (statement text, display context) pairs, one result tab each.
    RunQueries(Vec<(String, String)>),
    /// A save batch for one grid tab. Executed in order; aborts on the
    /// first failure.
    RunUpdates { tab_idx: usize, statements: Vec<String> },
    /// Catalog query for the schema pane; never produces a result tab.
    RunSchemaQuery(String),
    Quit,
}

#[derive(Debug)]
pub enum BridgeResponse {
    QueryStarted {
        query_idx: usize,
        context: String,
    },
    QueryFinished {
        query_idx: usize,
        elapsed: Duration,
        result: Result<ResultSet, String>,
    },
    UpdatesFinished {
        tab_idx: usize,
        completed: usize,
        total: usize,
        /// Error text of the statement that stopped the batch, if any.
        error: Option<String>,
    },
    SchemaFinished(Result<ResultSet, String>),
}

pub fn start_bridge(
    mut executor: Box<dyn QueryExecutor>,
    database: String,
) -> (Sender<BridgeRequest>, Receiver<BridgeResponse>) {
    let (req_tx, req_rx) = mpsc::channel();
    let (resp_tx, resp_rx) = mpsc::channel::<BridgeResponse>();

    thread::spawn(move || loop {
        match req_rx.recv() {
            Ok(BridgeRequest::RunQueries(batch)) => {
                for (idx, (sql, context)) in batch.iter().enumerate() {
                    let started = Instant::now();
                    let _ = resp_tx.send(BridgeResponse::QueryStarted {
                        query_idx: idx,
                        context: context.clone(),
                    });
                    let result = executor.run_query(sql, &database);
                    let _ = resp_tx.send(BridgeResponse::QueryFinished {
                        query_idx: idx,
                        elapsed: started.elapsed(),
                        result,
                    });
                }
            }
            Ok(BridgeRequest::RunUpdates { tab_idx, statements }) => {
                let total = statements.len();
                let mut completed = 0;
                let mut error = None;
                for sql in &statements {
                    match executor.run_statement(sql, &database) {
                        Ok(()) => completed += 1,
                        Err(e) => {
                            log::error!("update {}/{} failed: {}", completed + 1, total, e);
                            error = Some(e);
                            break;
                        }
                    }
                }
                let _ = resp_tx.send(BridgeResponse::UpdatesFinished {
                    tab_idx,
                    completed,
                    total,
                    error,
                });
            }
            Ok(BridgeRequest::RunSchemaQuery(sql)) => {
                let result = executor.run_query(&sql, &database);
                let _ = resp_tx.send(BridgeResponse::SchemaFinished(result));
            }
            Ok(BridgeRequest::Quit) | Err(_) => break,
        }
    });

    (req_tx, resp_rx)
}

/// Deterministic in-process backend used when no real backend is
/// configured, so the UI is explorable out of the box. Ignores the SQL
/// apart from echoing it as the originating statement.
pub struct DemoExecutor {
    pub rows: usize,
}

impl DemoExecutor {
    pub fn new() -> Self {
        Self { rows: 5_000 }
    }
}

const DEMO_NAMES: [&str; 8] = [
    "Anvil", "Bracket", "Crate", "Dowel", "Eyelet", "Flange", "Grommet", "Hinge",
];

impl QueryExecutor for DemoExecutor {
    fn run_query(&mut self, sql: &str, _database: &str) -> Result<ResultSet, String> {
        if sql.contains("INFORMATION_SCHEMA") {
            let columns = vec![
                ColumnMeta::new("TABLE_SCHEMA", "nvarchar(128)"),
                ColumnMeta::new("TABLE_NAME", "nvarchar(128)"),
            ];
            let rows = ["products", "orders", "customers"]
                .iter()
                .map(|t| vec![CellValue::Text("dbo".into()), CellValue::Text((*t).into())])
                .collect();
            return Ok(ResultSet::new(columns, rows, sql));
        }
        let columns = vec![
            ColumnMeta::new("id", "int"),
            ColumnMeta::new("name", "nvarchar(50)"),
            ColumnMeta::new("price", "decimal(10,2)"),
            ColumnMeta::new("in_stock", "bit"),
            ColumnMeta::new("notes", "varchar(max)"),
        ];
        let rows = (0..self.rows)
            .map(|i| {
                vec![
                    CellValue::Number((i + 1) as f64),
                    CellValue::Text(format!("{} #{}", DEMO_NAMES[i % DEMO_NAMES.len()], i + 1)),
                    CellValue::Number(((i * 37) % 9000) as f64 / 100.0 + 1.0),
                    CellValue::Bool(i % 3 != 0),
                    if i % 7 == 0 { CellValue::Null } else { CellValue::Text("ok".into()) },
                ]
            })
            .collect();
        Ok(ResultSet::new(columns, rows, sql))
    }

    fn run_statement(&mut self, _sql: &str, _database: &str) -> Result<(), String> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Test double: scripted per-statement outcomes plus a log of what ran.
    struct ScriptedExecutor {
        statement_outcomes: VecDeque<Result<(), String>>,
        executed: Vec<String>,
    }

    impl ScriptedExecutor {
        fn new(outcomes: Vec<Result<(), String>>) -> Self {
            Self { statement_outcomes: outcomes.into(), executed: Vec::new() }
        }
    }

    impl QueryExecutor for ScriptedExecutor {
        fn run_query(&mut self, sql: &str, _database: &str) -> Result<ResultSet, String> {
            Ok(ResultSet::new(vec![ColumnMeta::new("id", "int")], vec![], sql))
        }

        fn run_statement(&mut self, sql: &str, _database: &str) -> Result<(), String> {
            self.executed.push(sql.to_string());
            self.statement_outcomes.pop_front().unwrap_or(Ok(()))
        }
    }

    fn drain_updates(rx: &Receiver<BridgeResponse>) -> (usize, usize, Option<String>) {
        loop {
            match rx.recv_timeout(Duration::from_secs(2)).expect("bridge response") {
                BridgeResponse::UpdatesFinished { completed, total, error, .. } => {
                    return (completed, total, error)
                }
                _ => continue,
            }
        }
    }

    #[test]
    fn updates_run_sequentially_to_completion() {
        let exec = ScriptedExecutor::new(vec![Ok(()), Ok(()), Ok(())]);
        let (tx, rx) = start_bridge(Box::new(exec), "db".into());
        tx.send(BridgeRequest::RunUpdates {
            tab_idx: 0,
            statements: vec!["U1".into(), "U2".into(), "U3".into()],
        })
        .unwrap();
        let (completed, total, error) = drain_updates(&rx);
        assert_eq!((completed, total), (3, 3));
        assert!(error.is_none());
    }

    #[test]
    fn update_batch_aborts_on_first_failure() {
        let exec = ScriptedExecutor::new(vec![
            Ok(()),
            Err("constraint violation".into()),
            Ok(()),
        ]);
        let (tx, rx) = start_bridge(Box::new(exec), "db".into());
        tx.send(BridgeRequest::RunUpdates {
            tab_idx: 2,
            statements: vec!["U1".into(), "U2".into(), "U3".into()],
        })
        .unwrap();
        let (completed, total, error) = drain_updates(&rx);
        assert_eq!((completed, total), (1, 3));
        assert_eq!(error.as_deref(), Some("constraint violation"));
    }

    #[test]
    fn queries_report_start_and_finish_in_order() {
        let exec = ScriptedExecutor::new(vec![]);
        let (tx, rx) = start_bridge(Box::new(exec), "db".into());
        tx.send(BridgeRequest::RunQueries(vec![
            ("select 1".into(), "q1".into()),
            ("select 2".into(), "q2".into()),
        ]))
        .unwrap();

        let mut events = Vec::new();
        for _ in 0..4 {
            match rx.recv_timeout(Duration::from_secs(2)).unwrap() {
                BridgeResponse::QueryStarted { query_idx, .. } => events.push(("start", query_idx)),
                BridgeResponse::QueryFinished { query_idx, result, .. } => {
                    assert!(result.is_ok());
                    events.push(("finish", query_idx));
                }
                other => panic!("unexpected response: {:?}", other),
            }
        }
        assert_eq!(events, vec![("start", 0), ("finish", 0), ("start", 1), ("finish", 1)]);
    }

    #[test]
    fn demo_executor_is_deterministic() {
        let mut demo = DemoExecutor { rows: 10 };
        let a = demo.run_query("select * from products", "db").unwrap();
        let b = demo.run_query("select * from products", "db").unwrap();
        assert_eq!(a.row_count(), 10);
        assert_eq!(a.rows, b.rows);
        assert_eq!(a.table_name().as_deref(), Some("products"));
        assert_eq!(a.identity_column(), Some(0));
    }
}
