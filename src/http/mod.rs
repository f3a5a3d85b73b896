//! Request/response protocol of the file server.
//!
//! # Architecture
//!
//! - **`connection`**: the per-connection state machine
//! - **`parser`**: request terminator detection and token extraction
//! - **`request`**: recognized request shapes
//! - **`response`**: the success head and the not-found page
//! - **`writer`**: the ordered write queue actor owning the socket's write half
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌──────────────────┐
//!        │ AwaitingRequest  │ ← read until \r\n\r\n
//!        └────────┬─────────┘
//!                 │ request block     (bare GET loops back)
//!                 ▼
//!        ┌──────────────────┐
//!        │  ResolvingFile   │
//!        └───┬──────────┬───┘
//!     opened │          │ missing / rejected
//!            ▼          ▼
//!  ┌───────────────┐  ┌────────────────────┐
//!  │ StreamingFile │  │ RespondingNotFound │
//!  └───────┬───────┘  └─────────┬──────────┘
//!          │ last chunk read    │ drained
//!          ▼                    │
//!  ┌───────────────┐            │
//!  │   Draining    │────────────┤
//!  └───────────────┘  drained   ▼
//!                          ┌────────┐
//!                          │ Closed │
//!                          └────────┘
//! ```
//!
//! Each drain event from the write queue pulls exactly one more chunk, so a
//! connection never holds more than one unsent chunk of its file.

pub mod connection;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
