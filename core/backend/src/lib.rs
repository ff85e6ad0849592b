//! External collaborators of the Artfolio sync core.
//!
//! The sync layer never talks to ambient globals: the hosted backend, the
//! durable local store and the connectivity state are all injected through
//! the traits defined here. `memory` provides in-memory implementations for
//! tests and development; `local` provides a JSON-file-backed key-value
//! store for tooling.

pub mod connectivity;
pub mod kv;
pub mod local;
pub mod memory;
pub mod remote;

pub use connectivity::{ConnectivitySignal, SwitchableConnectivity};
pub use kv::KeyValueStore;
pub use local::FileKeyValueStore;
pub use memory::{MemoryKeyValueStore, MemoryObjectStore, MemoryRecordTable};
pub use remote::{ObjectStore, RecordTable};
