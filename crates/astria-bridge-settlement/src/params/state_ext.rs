use async_trait::async_trait;
use cnidarium::{
    StateRead,
    StateWrite,
};
use eyre::{
    OptionExt as _,
    Result,
    WrapErr as _,
};
use tracing::instrument;

use super::{
    storage::{
        self,
        keys,
    },
    Params,
};
use crate::{
    storage::StoredValue,
    utils::anyhow_to_eyre,
};

#[async_trait]
pub trait StateReadExt: StateRead {
    #[instrument(skip_all)]
    async fn get_params(&self) -> Result<Params> {
        let bytes = self
            .get_raw(keys::PARAMS)
            .await
            .map_err(anyhow_to_eyre)
            .wrap_err("failed reading raw bridge params from state")?
            .ok_or_eyre("bridge params not found")?;
        StoredValue::deserialize(&bytes)
            .and_then(|value| storage::Params::try_from(value).map(Params::from))
            .wrap_err("invalid bridge params bytes")
    }
}

impl<T: StateRead + ?Sized> StateReadExt for T {}

#[async_trait]
pub trait StateWriteExt: StateWrite {
    #[instrument(skip_all)]
    fn put_params(&mut self, params: &Params) -> Result<()> {
        let bytes = StoredValue::from(storage::Params::from(params))
            .serialize()
            .wrap_err("failed to serialize bridge params")?;
        self.put_raw(keys::PARAMS.to_string(), bytes);
        Ok(())
    }
}

impl<T: StateWrite + ?Sized> StateWriteExt for T {}
