pub mod license_service;
pub mod notify_service;
pub mod order_service;

pub use license_service::LicenseService;
pub use notify_service::AdminNotifier;
pub use order_service::{CheckOutcome, OrderService};
