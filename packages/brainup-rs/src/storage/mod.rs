//! Session-scoped temporary storage with expiry.

pub mod ledger;
pub mod payload;
pub mod store;
pub mod sweeper;

pub use ledger::{Ledger, RecordState, TempFileRecord};
pub use payload::{decode_data_uri, Payload, Upload};
pub use store::{validate_component, ArtifactClass, SessionStore, SweepReport};
pub use sweeper::{Sweeper, SweeperHandle};
