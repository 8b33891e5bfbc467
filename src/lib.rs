//! # RAG Relay
//!
//! A small relay service that forwards a `{key, query}` request to an
//! external retrieval-augmented-generation (RAG) worker process and returns
//! the worker's answer plus the diagnostic log lines it emitted.
//!
//! The worker is launched once per request with the key and query as
//! positional arguments. It writes diagnostic log lines (`[` prefix) and a
//! single JSON result line (`{` prefix) to stdout, in any order; the relay
//! buffers the stream, demultiplexes it after the process terminates, and
//! produces exactly one terminal response per request.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────┐   ┌─────────────┐   ┌────────────┐   ┌───────────┐
//! │ Client │──▶│ HTTP / CLI  │──▶│   Worker    │──▶│  Demux +  │
//! │        │◀──│  surface    │◀──│  process    │   │ assembler │
//! └────────┘   └─────────────┘   └────────────┘   └───────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`worker`] | Worker process adapter (spawn, drain, reap) |
//! | [`demux`] | Stdout line classification |
//! | [`reply`] | Terminal reply assembly |
//! | [`server`] | HTTP relay server |

pub mod ask;
pub mod config;
pub mod demux;
pub mod reply;
pub mod server;
pub mod status;
pub mod worker;
