//! Document store client: track documents (§4.7, §6) and job records (§6),
//! speaking the same Firestore-shaped REST protocol as the rest of the host
//! codebase's document store client.

pub mod client;
pub mod error;
pub mod job_store;
pub mod track_store;
pub mod types;

pub use client::{DocStoreClient, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use job_store::JobStore;
pub use track_store::FirestoreTrackStore;
