pub mod invoice;
pub mod record;
pub mod shipment;
pub mod sync_result;
pub mod tenant;

pub use invoice::{InvoiceDraft, InvoiceLine, MoveType};
pub use record::Record;
pub use shipment::{Leg, MasterShipment, PartyInput, PartyRole};
pub use sync_result::*;
pub use tenant::{OperationKind, PerTenant, TenantCode};
