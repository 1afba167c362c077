/// Transaction timeout in seconds applied when a caller asks for the default.
pub const DEFAULT_TRANSACTION_TIMEOUT: u32 = 600;

/// Identifier written into every global id minted by a transaction manager.
pub const DEFAULT_TM_ID: &str = "txflow-transaction-manager";

/// Longest transaction manager identifier accepted, in characters.
pub const MAX_TM_ID_LENGTH: usize = 64;

pub const MAX_GTRID_SIZE: usize = 64;
pub const MAX_BQUAL_SIZE: usize = 64;

/// Format id stamped on xids minted by txflow ("TxFl").
pub const TXFLOW_FORMAT_ID: i32 = 0x5478_466c;

/// Event bus topic for propagation events.
pub const PROPAGATION_EVENT: &str = "txflow_propagation_event";
