//! Single-writer transaction submission
//!
//! One `TxSubmitter` per signing account. The lane is an async mutex over the
//! hash of the last unsettled transaction: at most one transaction is in
//! flight. A transaction that outlives the confirmation timeout keeps the
//! lane; the next submission first checks whether it has been mined or
//! dropped and refuses to send while it is still pending. The provider's
//! nonce filler fetches the account nonce on every send.

use alloy_network::{EthereumWallet, ReceiptResponse};
use alloy_primitives::{Address, Bytes, Log, B256};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_types::{BlockId, TransactionRequest};
use alloy_signer_local::PrivateKeySigner;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::verify::ExecutionReport;
use crate::error::ArbError;

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// A mined transaction as far as the submitter cares
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinedTx {
    pub success: bool,
    pub block: Option<u64>,
    pub logs: Vec<Log>,
}

/// Node operations the submitter needs
pub trait TxBackend: Send + Sync {
    /// Sign and broadcast; returns the transaction hash
    fn send(&self, tx: TransactionRequest) -> impl Future<Output = Result<B256, ArbError>> + Send;

    /// Receipt lookup, `None` while unmined
    fn receipt(&self, hash: B256) -> impl Future<Output = Result<Option<MinedTx>, ArbError>> + Send;

    /// Whether the node still knows the transaction (mempool or chain)
    fn is_known(&self, hash: B256) -> impl Future<Output = Result<bool, ArbError>> + Send;

    /// `eth_call`, at `block` when given, else latest
    fn call(
        &self,
        tx: TransactionRequest,
        block: Option<u64>,
    ) -> impl Future<Output = Result<Bytes, ArbError>> + Send;

    /// Poll for the receipt until `timeout`; `None` if it never came
    fn wait_receipt(
        &self,
        hash: B256,
        timeout: Duration,
    ) -> impl Future<Output = Result<Option<MinedTx>, ArbError>> + Send {
        async move {
            let polling = async {
                loop {
                    if let Some(mined) = self.receipt(hash).await? {
                        return Ok::<MinedTx, ArbError>(mined);
                    }
                    tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
                }
            };
            match tokio::time::timeout(timeout, polling).await {
                Ok(result) => result.map(Some),
                Err(_) => Ok(None),
            }
        }
    }
}

/// `TxBackend` over a wallet-filled alloy provider
pub struct RpcTxBackend {
    provider: DynProvider,
}

impl RpcTxBackend {
    pub fn new(provider: DynProvider) -> Self {
        Self { provider }
    }
}

impl TxBackend for RpcTxBackend {
    async fn send(&self, tx: TransactionRequest) -> Result<B256, ArbError> {
        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| ArbError::from_transport("eth_sendTransaction", e))?;
        Ok(*pending.tx_hash())
    }

    async fn receipt(&self, hash: B256) -> Result<Option<MinedTx>, ArbError> {
        let receipt = self
            .provider
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| ArbError::from_transport(format!("receipt for {:?}", hash), e))?;

        Ok(receipt.map(|receipt| MinedTx {
            success: receipt.status(),
            block: receipt.block_number(),
            logs: receipt
                .inner
                .logs()
                .iter()
                .map(|log| log.inner.clone())
                .collect(),
        }))
    }

    async fn is_known(&self, hash: B256) -> Result<bool, ArbError> {
        let tx = self
            .provider
            .get_transaction_by_hash(hash)
            .await
            .map_err(|e| ArbError::from_transport(format!("eth_getTransactionByHash {:?}", hash), e))?;
        Ok(tx.is_some())
    }

    async fn call(&self, tx: TransactionRequest, block: Option<u64>) -> Result<Bytes, ArbError> {
        let to = tx.to;
        let call = self.provider.call(tx);
        let call = match block {
            Some(number) => call.block(BlockId::number(number)),
            None => call,
        };
        call.await
            .map_err(|e| ArbError::from_transport(format!("eth_call {:?}", to), e))
    }
}

pub struct TxSubmitter<B: TxBackend = RpcTxBackend> {
    backend: B,
    from: Address,
    /// Hash of the last sent transaction that has not settled yet
    lane: Mutex<Option<B256>>,
    confirmation_timeout: Duration,
}

impl TxSubmitter<RpcTxBackend> {
    pub async fn connect(
        rpc_url: &str,
        signer: PrivateKeySigner,
        confirmation_timeout: Duration,
    ) -> Result<Self, ArbError> {
        let from = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect(rpc_url)
            .await
            .map_err(|e| ArbError::config(format!("cannot connect to RPC_URL: {}", e)))?
            .erased();

        info!("✓ Signer loaded: {:?}", from);

        Ok(Self::with_backend(RpcTxBackend::new(provider), from, confirmation_timeout))
    }
}

impl<B: TxBackend> TxSubmitter<B> {
    pub fn with_backend(backend: B, from: Address, confirmation_timeout: Duration) -> Self {
        Self {
            backend,
            from,
            lane: Mutex::new(None),
            confirmation_timeout,
        }
    }

    pub fn from_address(&self) -> Address {
        self.from
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Transaction still holding the lane, if any
    pub async fn pending_tx(&self) -> Option<B256> {
        *self.lane.lock().await
    }

    fn request(&self, to: Address, calldata: Bytes) -> TransactionRequest {
        TransactionRequest::default()
            .from(self.from)
            .to(to)
            .input(calldata.into())
    }

    /// `eth_call` the transaction from the signer. A revert comes back as an
    /// `ExternalCall` error carrying the decoded reason.
    pub async fn dry_run(&self, to: Address, calldata: Bytes) -> Result<Bytes, ArbError> {
        self.backend.call(self.request(to, calldata), None).await
    }

    /// Ok once `previous` is mined or gone from the node
    async fn settle(&self, previous: B256) -> Result<(), ArbError> {
        if self.backend.receipt(previous).await?.is_some() {
            info!("Previous transaction {:?} mined, lane free", previous);
            return Ok(());
        }
        if !self.backend.is_known(previous).await? {
            warn!("Previous transaction {:?} dropped by the node, lane free", previous);
            return Ok(());
        }
        Err(ArbError::external(
            format!("lane {:?}", self.from),
            format!("transaction {:?} is still pending", previous),
        ))
    }

    /// Send, then hold the lane until the receipt arrives.
    pub async fn submit(&self, to: Address, calldata: Bytes) -> Result<ExecutionReport, ArbError> {
        let mut lane = self.lane.lock().await;

        if let Some(previous) = *lane {
            self.settle(previous).await?;
            *lane = None;
        }

        let tx = self.request(to, calldata);
        let tx_hash = self.backend.send(tx.clone()).await?;
        *lane = Some(tx_hash);
        info!("📤 Submitted {:?}, waiting for receipt", tx_hash);

        let mined = match self.backend.wait_receipt(tx_hash, self.confirmation_timeout).await? {
            Some(mined) => mined,
            None => {
                error!(
                    "No receipt for {:?} after {:?}, lane stays held",
                    tx_hash, self.confirmation_timeout
                );
                return Err(ArbError::external(
                    format!("receipt for {:?}", tx_hash),
                    format!("not mined within {:?}", self.confirmation_timeout),
                ));
            }
        };
        *lane = None;

        // Receipts carry no revert data. Replay against the parent block:
        // state at the inclusion block already has this transaction applied.
        let revert = if mined.success {
            None
        } else {
            warn!("Transaction {:?} reverted in block {:?}", tx_hash, mined.block);
            match mined.block {
                Some(number) => self
                    .backend
                    .call(tx, Some(number.saturating_sub(1)))
                    .await
                    .err()
                    .and_then(|e| e.revert_reason().cloned()),
                None => None,
            }
        };

        Ok(ExecutionReport {
            success: mined.success,
            tx_hash: Some(tx_hash),
            block: mined.block,
            logs: mined.logs,
            revert,
        })
    }
}
