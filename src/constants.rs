//! Well-known numeric constants baked into emitted code.

/// c7 global slots reserved by the runtime dispatcher. Contract state
/// variables are numbered from [`c7::FIRST_STATE_VAR`] upward.
pub mod c7 {
    /// Contract public key.
    pub const PUBKEY: u32 = 2;
    /// Replay-protection timestamp.
    pub const TIMESTAMP: u32 = 3;
    /// "Constructor has run" flag.
    pub const CONSTRUCTOR_FLAG: u32 = 6;
    /// First slot available to contract state variables.
    pub const FIRST_STATE_VAR: u32 = 10;
}

pub mod sendrawmsg {
    /// Default mode flag when the source supplies none.
    pub const DEFAULT_FLAG: u32 = 3;
}

/// Exception codes thrown by emitted runtime checks.
pub mod exception {
    pub const ARRAY_INDEX_OUT_OF_RANGE: u32 = 50;
}

/// Field indices of the internal-message header
/// (`int_msg_info$0 ... = CommonMsgInfoRelaxed`).
pub mod int_msg_info {
    pub const IHR_DISABLED: usize = 0;
    pub const BOUNCE: usize = 1;
    pub const BOUNCED: usize = 2;
    pub const SRC: usize = 3;
    pub const DEST: usize = 4;
    pub const GRAMS: usize = 5;
    pub const CURRENCY: usize = 6;
    pub const IHR_FEE: usize = 7;
    pub const FWD_FEE: usize = 8;
    pub const CREATED_LT: usize = 9;
    pub const CREATED_AT: usize = 10;
}

/// Field indices of the external-outbound header
/// (`ext_out_msg_info$11 ... = CommonMsgInfo`).
pub mod ext_msg_info {
    pub const SRC: usize = 0;
    pub const DEST: usize = 1;
    pub const CREATED_LT: usize = 2;
    pub const CREATED_AT: usize = 3;
}
