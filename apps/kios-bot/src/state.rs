use kios_db::repositories::{PointsRepository, SessionRepository};

use crate::config::Config;
use crate::services::{AdminNotifier, LicenseService, OrderService};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sessions: SessionRepository,
    pub points: PointsRepository,
    pub orders: OrderService,
    pub licenses: LicenseService,
    pub notifier: AdminNotifier,
}
