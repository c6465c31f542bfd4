pub mod entities;
pub mod events;
pub mod ports;
pub mod repositories;

pub use entities::*;
pub use events::RequestEvent;
pub use ports::{ContractGenerator, SettlementLedger};
pub use repositories::{ProviderRepository, RequestRepository};
