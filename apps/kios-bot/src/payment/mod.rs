use anyhow::Result;
use async_trait::async_trait;

pub mod qris;

pub use qris::QrisGateway;

/// A created QRIS deposit, ready to show to the buyer.
#[derive(Debug, Clone)]
pub struct Deposit {
    pub deposit_code: String,
    pub qr_url: String,
    pub expires_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepositStatus {
    Paid,
    Unpaid,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a deposit and return the QR to present.
    async fn create_deposit(&self, order_id: &str, amount: i64) -> Result<Deposit>;

    /// Poll a deposit once.
    async fn deposit_status(&self, deposit_code: &str) -> Result<DepositStatus>;

    fn name(&self) -> &str;
}
