pub mod license_repo;
pub mod order_repo;
pub mod points_repo;
pub mod session_repo;

pub use license_repo::LicenseRepository;
pub use order_repo::OrderRepository;
pub use points_repo::PointsRepository;
pub use session_repo::SessionRepository;
