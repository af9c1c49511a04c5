use crate::context::FetchContext;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use types::{Pair, Point};

/// A source of raw price points
///
/// An origin answers every requested pair: pairs it cannot price come back as error
/// points, so one broken pool never hides the others. An `Err` is reserved for failures
/// that stop the whole fetch, such as the latest block number being unavailable or the
/// context being cancelled.
#[async_trait]
pub trait Origin: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_data_points(&self, ctx: &FetchContext, pairs: &[Pair]) -> Result<HashMap<Pair, Point>>;
}
