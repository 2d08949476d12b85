//! Test client for exercising a jsonstream server.
//!
//! # Crate Structure
//!
//! - [`transport`]: Endpoints and the blocking socket stream (local sockets, TCP)
//! - [`frame`]: JSON object framing with partial-read reassembly
//! - [`client`]: Envelopes, command dispatch and the receive loop
//!
//! The `jsonstream-testclient` binary (behind the `cli` feature) wires these
//! together behind a small command line.

/// Re-export transport types.
pub mod transport {
    pub use jsonstream_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use jsonstream_frame::*;
}

/// Re-export client types.
pub mod client {
    pub use jsonstream_client::*;
}
