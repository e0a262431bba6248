//! RuneVault Core
//!
//! Unsigned transaction assembly for protocol-asset and inscription
//! transfers. The crate selects inputs, settles the fee, lays out outputs,
//! tags the sender's taproot inputs and serializes the result as a PSBT
//! for an external signer.
//!
//! # Modules
//!
//! - `providers`: Traits for the indexer, fee service, signer, broadcaster and metadata codec
//! - `psbt`: The transaction draft, input construction and the finalization pass
//! - `assembly`: Fee convergence and the asset send, asset mint and inscription send assemblers
//! - `transfer`: Sign-and-broadcast flows built on the assemblers
//!
//! # Example
//!
//! ```no_run
//! use runevault_core::assembly::{AssetSendRequest, PsbtAssembler};
//! use runevault_core::providers::{MetadataCodec, UtxoSource};
//! use bitcoin::Network;
//!
//! fn send<S: UtxoSource, C: MetadataCodec>(source: &S, codec: &C, request: &AssetSendRequest) {
//!     let assembler = PsbtAssembler::new(source, codec, Network::Bitcoin);
//!     match assembler.create_asset_send_psbt(request) {
//!         Ok(unsigned) => println!("fee {} sats, psbt {}", unsigned.fee, unsigned.psbt_base64),
//!         Err(e) => eprintln!("assembly failed: {}", e),
//!     }
//! }
//! ```

pub mod assembly;
pub mod providers;
pub mod psbt;
pub mod transfer;

pub use assembly::{AssetMintRequest, AssetSendRequest, InscriptionSendRequest, PsbtAssembler};
pub use providers::{
    Broadcaster, Edict, FeeRateSource, MetadataCodec, ProtocolMessage, PsbtSigner, SignRequest,
    SignedPsbt, UtxoSource,
};
pub use psbt::{finalize_inputs, InputOptions, TxDraft};
pub use transfer::{AssetTransfer, InscriptionTransfer, TransferService};

pub use runevault_common::{UnsignedPsbt, WalletError};
