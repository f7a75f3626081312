pub mod license;
pub mod order;
pub mod points;
pub mod session;
pub mod variant;
