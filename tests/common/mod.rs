//! Shared test fixtures
//!
//! `ScriptedDriver` replays queued responses in order, then keeps returning
//! its fallback rows. Every call is recorded.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ledgerq::collection::{Collection, DatabaseDriver, DriverError, EngineConfig, LedgerData};
use ledgerq::planner::IndexInfo;
use ledgerq::schema::ledger_data;
use serde_json::{Map, Value};

#[derive(Default)]
pub struct ScriptedDriver {
    responses: Mutex<VecDeque<Result<Vec<Value>, DriverError>>>,
    fallback: Mutex<Vec<Value>>,
    calls: Mutex<Vec<(String, Map<String, Value>)>>,
    indexes: Mutex<Vec<IndexInfo>>,
}

impl ScriptedDriver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_fallback(rows: Vec<Value>) -> Arc<Self> {
        let driver = Self::default();
        *driver.fallback.lock().unwrap() = rows;
        Arc::new(driver)
    }

    pub fn push_response(&self, response: Result<Vec<Value>, DriverError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn set_indexes(&self, indexes: Vec<IndexInfo>) {
        *self.indexes.lock().unwrap() = indexes;
    }

    pub fn calls(&self) -> Vec<(String, Map<String, Value>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl DatabaseDriver for ScriptedDriver {
    async fn execute(&self, text: &str, params: &Map<String, Value>) -> Result<Vec<Value>, DriverError> {
        self.calls
            .lock()
            .unwrap()
            .push((text.to_string(), params.clone()));
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(response) => response,
            None => Ok(self.fallback.lock().unwrap().clone()),
        }
    }

    async fn list_indexes(&self, _collection: &str) -> Result<Vec<IndexInfo>, DriverError> {
        Ok(self.indexes.lock().unwrap().clone())
    }
}

/// Ledger collections over one fast and one slow scripted connection
pub fn ledger(
    fast: &Arc<ScriptedDriver>,
    slow: &Arc<ScriptedDriver>,
    config: EngineConfig,
) -> LedgerData {
    ledger_data(fast.clone(), slow.clone(), &config)
}

pub fn collection(data: &LedgerData, name: &str) -> Arc<Collection> {
    data.collection(name).unwrap()
}
