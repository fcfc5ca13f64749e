use std::sync::Arc;
use thiserror::Error;

use crate::{Database, DatabaseError, PrimaryKey};

/// Tracks and mutates credit balances. All mutations go through the
/// database's conditional update, so the balance can never go negative even
/// under concurrent debits.
pub struct Ledger<Db> {
    db: Arc<Db>,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Insufficient credits: {required} required, {balance} available")]
    InsufficientCredits { required: f64, balance: f64 },
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

impl<Db> Ledger<Db>
where
    Db: Database,
{
    pub fn new(db: &Arc<Db>) -> Self {
        Self { db: db.clone() }
    }

    /// Subtracts `amount` from the user's balance, returning the new balance
    pub async fn debit(&self, user_id: PrimaryKey, amount: f64) -> Result<f64, LedgerError> {
        match self.db.try_debit_credits(user_id, amount).await? {
            Some(balance) => Ok(balance),
            None => {
                let balance = self.balance(user_id).await?;

                Err(LedgerError::InsufficientCredits {
                    required: amount,
                    balance,
                })
            }
        }
    }

    /// Adds `amount` to the user's balance, returning the new balance
    pub async fn credit(&self, user_id: PrimaryKey, amount: f64) -> Result<f64, LedgerError> {
        Ok(self.db.credit_credits(user_id, amount).await?)
    }

    /// Returns the user's current balance
    pub async fn balance(&self, user_id: PrimaryKey) -> Result<f64, LedgerError> {
        let user = self.db.user_by_id(user_id).await?;
        Ok(user.credits)
    }

    /// Fails with [LedgerError::InsufficientCredits] unless the balance
    /// covers `amount`. Does not mutate anything.
    pub async fn ensure_balance(&self, user_id: PrimaryKey, amount: f64) -> Result<(), LedgerError> {
        let balance = self.balance(user_id).await?;

        if balance < amount {
            return Err(LedgerError::InsufficientCredits {
                required: amount,
                balance,
            });
        }

        Ok(())
    }
}
