//! Scripted in-memory chain for tests
//!
//! Responses are registered per `(target, call data)` and optionally per block. Calls
//! without a registered response revert, like a contract without that function would.

use crate::chain::{Call, CallResult, ChainClient};
use crate::contracts::{self, ContractKind};
use crate::error::{OriginError, Result};
use async_trait::async_trait;
use ethabi::{Address, Token};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};

type CallKey = (Address, Vec<u8>);

#[derive(Debug, Default)]
pub struct ScriptedChainClient {
    block: AtomicU64,
    responses: Mutex<HashMap<CallKey, Vec<u8>>>,
    block_responses: Mutex<HashMap<(CallKey, u64), Vec<u8>>>,
    failing_batches: AtomicU32,
    batches: AtomicUsize,
    calls: AtomicUsize,
}

impl ScriptedChainClient {
    pub fn new(block: u64) -> Self {
        Self {
            block: AtomicU64::new(block),
            ..Default::default()
        }
    }

    pub fn set_block(&self, block: u64) {
        self.block.store(block, Ordering::SeqCst);
    }

    /// Answer `function(args)` on `target` with `outputs` at every block
    pub fn respond(
        &self,
        target: Address,
        kind: ContractKind,
        function: &str,
        args: &[Token],
        outputs: &[Token],
    ) -> Result<()> {
        let data = contracts::encode_call(kind, function, args)?;
        self.responses.lock().insert((target, data), ethabi::encode(outputs));
        Ok(())
    }

    /// Answer `function(args)` on `target` with `outputs` at `block` only
    pub fn respond_at(
        &self,
        block: u64,
        target: Address,
        kind: ContractKind,
        function: &str,
        args: &[Token],
        outputs: &[Token],
    ) -> Result<()> {
        let data = contracts::encode_call(kind, function, args)?;
        self.block_responses
            .lock()
            .insert(((target, data), block), ethabi::encode(outputs));
        Ok(())
    }

    /// Make the next `count` batches fail with a transport error
    pub fn fail_next_batches(&self, count: u32) {
        self.failing_batches.store(count, Ordering::SeqCst);
    }

    /// Number of `call_batch` invocations so far, failed ones included
    pub fn batch_count(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    /// Number of individual calls executed in successful batches
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainClient for ScriptedChainClient {
    async fn block_number(&self) -> Result<u64> {
        Ok(self.block.load(Ordering::SeqCst))
    }

    async fn call_batch(&self, calls: &[Call], block: u64) -> Result<Vec<CallResult>> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failing_batches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(OriginError::Rpc("scripted transport failure".into()));
        }

        self.calls.fetch_add(calls.len(), Ordering::SeqCst);
        let responses = self.responses.lock();
        let block_responses = self.block_responses.lock();
        Ok(calls
            .iter()
            .map(|call| {
                let key = (call.target, call.data.clone());
                block_responses
                    .get(&(key.clone(), block))
                    .or_else(|| responses.get(&key))
                    .map(|data| CallResult::ok(data.clone()))
                    .unwrap_or_else(CallResult::reverted)
            })
            .collect())
    }
}
