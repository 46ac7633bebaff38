// Timeout-aware sockets and the listen address type.
pub mod socket;

// Buffered input with byte budgets, staged output.
pub mod buffer;

// The shared per-connection handle.
pub mod connection;
