pub mod crm;
pub mod nbu;

pub use crm::CrmRecordStore;
pub use nbu::NbuRateProvider;
