use std::fmt;
use std::ops::Deref;

use crate::database::Database;
use crate::error::Result;

/// Transaction guard holding the database until commit or rollback.
///
/// Dereferences to [`Database`], so statements can be prepared and executed
/// through it. Dropping the guard without finishing rolls the transaction back.
pub struct Transaction<'db> {
    db: &'db mut Database,
    finished: bool,
}

impl Database {
    /// Begin a deferred transaction.
    ///
    /// # Errors
    /// Returns the engine error if `BEGIN` fails (e.g. a transaction is already
    /// open on this connection).
    pub fn begin(&mut self) -> Result<Transaction<'_>> {
        self.exec("BEGIN")?;
        tracing::debug!("transaction started");
        Ok(Transaction {
            db: self,
            finished: false,
        })
    }

    /// Run `f` inside a transaction.
    ///
    /// The transaction commits when `f` returns `Ok(true)` and rolls back when
    /// it returns `Ok(false)` or an error; the error is passed through.
    /// Returns whether the transaction committed.
    ///
    /// # Errors
    /// Returns errors from `BEGIN`/`COMMIT`/`ROLLBACK` or from `f`.
    pub fn transaction<F>(&mut self, f: F) -> Result<bool>
    where
        F: FnOnce(&Database) -> Result<bool>,
    {
        let tx = self.begin()?;
        match f(&*tx) {
            Ok(true) => {
                tx.commit()?;
                Ok(true)
            }
            Ok(false) => {
                tx.rollback()?;
                Ok(false)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    tracing::warn!(error = %rollback_err, "rollback after failed transaction body failed");
                }
                Err(err)
            }
        }
    }
}

impl Transaction<'_> {
    /// Commit the transaction.
    ///
    /// # Errors
    /// Returns the engine error if `COMMIT` fails; the guard then rolls back on
    /// drop.
    pub fn commit(mut self) -> Result<()> {
        self.db.exec("COMMIT")?;
        self.finished = true;
        tracing::debug!("transaction committed");
        Ok(())
    }

    /// Roll the transaction back.
    ///
    /// # Errors
    /// Returns the engine error if `ROLLBACK` fails.
    pub fn rollback(mut self) -> Result<()> {
        self.finished = true;
        self.db.exec("ROLLBACK")?;
        tracing::debug!("transaction rolled back");
        Ok(())
    }
}

impl Deref for Transaction<'_> {
    type Target = Database;

    fn deref(&self) -> &Database {
        &*self.db
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.finished || !self.db.is_open() {
            return;
        }
        tracing::warn!("transaction dropped without commit; rolling back");
        if let Err(err) = self.db.exec("ROLLBACK") {
            tracing::warn!(error = %err, "implicit rollback failed");
        }
    }
}

impl fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("db", &self.db)
            .field("finished", &self.finished)
            .finish()
    }
}
