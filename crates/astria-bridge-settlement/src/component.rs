use cnidarium::{
    StateRead,
    StateWrite,
};
use eyre::WrapErr as _;
use tendermint::Time;
use tracing::{
    debug,
    instrument,
    warn,
    Level,
};

use crate::{
    batch,
    genesis::GenesisState,
    params::{
        Params,
        StateReadExt as _,
        StateWriteExt as _,
    },
    pool::StateReadExt as _,
    valset::{
        self,
        ValidatorPowerSource,
    },
    BridgeError,
};

/// The block being finalized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockContext {
    pub height: u64,
    pub time: Time,
}

/// Drives the bridge's per-block decisions.
///
/// Every hook runs to completion on the caller's task; nothing is spawned, so all replicas apply
/// the same writes in the same order.
pub struct BridgeComponent<V> {
    validators: V,
}

impl<V: ValidatorPowerSource> BridgeComponent<V> {
    pub fn new(validators: V) -> Self {
        Self {
            validators,
        }
    }

    /// Validates and stores the genesis parameters.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidParams`] if the parameters fail validation.
    #[instrument(name = "BridgeComponent::init_chain", skip_all, err)]
    pub async fn init_chain<S: StateWrite>(
        &self,
        state: &mut S,
        genesis: &GenesisState,
    ) -> Result<(), BridgeError> {
        genesis.params.validate()?;
        state
            .put_params(&genesis.params)
            .wrap_err("failed to put bridge params")?;
        Ok(())
    }

    /// Builds a batch if one is due, then stores a valset snapshot if one is due.
    ///
    /// Failures of either decision are logged and do not fail the block.
    ///
    /// # Errors
    ///
    /// Returns an error only if the bridge parameters could not be read.
    #[instrument(
        name = "BridgeComponent::end_block",
        skip_all,
        fields(height = block.height),
        err(level = Level::WARN)
    )]
    pub async fn end_block<S: StateWrite>(
        &self,
        state: &mut S,
        block: &BlockContext,
    ) -> Result<(), BridgeError> {
        let params = state
            .get_params()
            .await
            .wrap_err("failed to get bridge params")?;

        match build_batch_if_due(state, &params, block).await {
            Ok(()) => {}
            Err(BridgeError::EmptyPool) => debug!("batch due but pool is empty"),
            Err(error) => warn!(
                error = &error as &dyn std::error::Error,
                "failed to build outgoing batch; skipping it this block"
            ),
        }

        if let Err(error) =
            valset::maybe_update_valset(state, &self.validators, block.height, &params).await
        {
            warn!(
                error = &error as &dyn std::error::Error,
                "failed to update valset; skipping it this block"
            );
        }
        Ok(())
    }
}

async fn build_batch_if_due<S: StateWrite>(
    state: &mut S,
    params: &Params,
    block: &BlockContext,
) -> Result<(), BridgeError> {
    let on_cadence = block
        .height
        .checked_rem(params.batch_interval)
        .is_some_and(|rem| rem == 0);
    let unbatched = state
        .get_unbatched_count()
        .await
        .wrap_err("failed to get unbatched transfer count")?;
    if !on_cadence && unbatched < params.batch_num {
        return Ok(());
    }
    batch::build_batch(state, params.batch_num, block).await?;
    Ok(())
}

/// Reads back the bridge's genesis state.
///
/// # Errors
///
/// Returns an error if the parameters could not be read.
#[instrument(skip_all, err)]
pub async fn export_genesis<S: StateRead + ?Sized>(state: &S) -> Result<GenesisState, BridgeError> {
    let params = state
        .get_params()
        .await
        .wrap_err("failed to get bridge params")?;
    Ok(GenesisState {
        params,
    })
}
