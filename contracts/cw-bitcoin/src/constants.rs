/// The maximum number of signatories admitted into a signatory set (spec §2.A,
/// §3). Chosen so the assembled witness script always fits comfortably within
/// Bitcoin's standard witness-script size limits.
pub const MAX_SIGNATORIES: u64 = 76;

/// The fixed fee floor used by the disbursal builder, in satoshis (spec §4.E,
/// §9 "fixed fee policy"). No live mempool fee estimation.
pub const MIN_RELAY_FEE: u64 = 1000;

/// The length in bytes of a compressed secp256k1 public key.
pub const SIGNATORY_KEY_LENGTH: usize = 33;

/// The length in bytes of an ed25519 signature.
pub const SIGNATURE_LENGTH: usize = 64;

/// The ratio applied to a signatory set's total voting power to compute its
/// signing threshold: `ceil(2 * vp / 3)` (spec §3, §4.A).
pub const SIGSET_THRESHOLD: (u64, u64) = (2, 3);
