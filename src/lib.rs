pub mod amount;
pub mod csv;
pub mod gateway;
pub mod lock;
pub mod model;
pub mod orchestrator;

pub use amount::Amount;
pub use gateway::{AccountGateway, GatewayError, InMemoryGateway};
pub use lock::{AccountLockManager, LockError, LockManager};
pub use model::{Account, AccountId, TransferRequest};
pub use orchestrator::{Orchestrator, ReasonCode, TransferError};
