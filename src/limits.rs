/// Hard cap on reservations tracked per resource (all states).
pub const MAX_RESERVATIONS_PER_RESOURCE: usize = 10_000;

/// Longest accepted owner reference, in bytes.
pub const MAX_OWNER_ID_LEN: usize = 256;

/// Largest WAL payload accepted on replay. A committed reservation encodes
/// to well under a kilobyte; anything bigger is a corrupt length header.
pub const MAX_WAL_FRAME_LEN: usize = 64 * 1024;

/// Calendar colors, assigned by stable enumeration index modulo length.
pub const DEFAULT_PALETTE: &[&str] = &[
    "#3b82f6", // blue
    "#10b981", // green
    "#f59e0b", // amber
    "#ef4444", // red
    "#8b5cf6", // violet
    "#ec4899", // pink
    "#14b8a6", // teal
    "#f97316", // orange
];
