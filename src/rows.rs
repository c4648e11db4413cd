use crate::error::Result;
use crate::row::Row;
use crate::statement::{CursorState, Statement};
use crate::types::Value;

/// The remaining rows of one traversal of a statement's cursor.
///
/// Rows are fetched lazily: the first call to [`next`](Self::next) performs
/// the first step. The sequence is single-pass; once it reports exhaustion it
/// keeps doing so, and a new [`Statement::cursor`] is needed to start over.
///
/// `Rows` holds the statement's only mutable borrow, so a second cursor on the
/// same statement cannot be started while this one is alive. Dropping it
/// rewinds the statement to [`CursorState::Ready`] (a failed statement stays
/// failed until reset explicitly).
pub struct Rows<'stmt> {
    stmt: &'stmt mut Statement,
}

impl<'stmt> Rows<'stmt> {
    pub(crate) fn new(stmt: &'stmt mut Statement) -> Self {
        Self { stmt }
    }

    /// Advance to the next row.
    ///
    /// Returns `Ok(None)` once the cursor is exhausted.
    ///
    /// # Errors
    /// Returns the engine error if the step fails; the statement is then in
    /// [`CursorState::Error`] and every further call fails with
    /// `UsageError::StatementFailed`.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<Option<Row<'_>>> {
        match self.stmt.step()? {
            CursorState::Row => Ok(Some(Row::new(&*self.stmt))),
            _ => Ok(None),
        }
    }

    #[must_use]
    pub fn state(&self) -> CursorState {
        self.stmt.state()
    }

    /// True once the traversal has reached its end.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.stmt.state() == CursorState::Done
    }

    /// Turn the cursor into an iterator of values produced by `f`.
    pub fn map<F, T>(self, f: F) -> MappedRows<'stmt, F>
    where
        F: FnMut(&Row<'_>) -> Result<T>,
    {
        MappedRows {
            rows: self,
            f,
            finished: false,
        }
    }

    /// Read every remaining row into owned values.
    ///
    /// # Errors
    /// Returns the first step or conversion error.
    pub fn collect_values(self) -> Result<Vec<Vec<Value>>> {
        self.map(|row| row.values()).collect()
    }

    /// Step through the remaining rows without reading them.
    ///
    /// # Errors
    /// Returns the first step error.
    pub fn count_remaining(mut self) -> Result<usize> {
        let mut count = 0;
        while self.next()?.is_some() {
            count += 1;
        }
        Ok(count)
    }
}

impl Drop for Rows<'_> {
    fn drop(&mut self) {
        self.stmt.release_cursor();
    }
}

/// Iterator adapter returned by [`Rows::map`].
///
/// Yields `Ok(T)` per row, then stops. After an error it yields that error
/// once and stops.
pub struct MappedRows<'stmt, F> {
    rows: Rows<'stmt>,
    f: F,
    finished: bool,
}

impl<F, T> Iterator for MappedRows<'_, F>
where
    F: FnMut(&Row<'_>) -> Result<T>,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let item = match self.rows.next() {
            Ok(Some(row)) => (self.f)(&row),
            Ok(None) => {
                self.finished = true;
                return None;
            }
            Err(err) => Err(err),
        };
        if item.is_err() {
            self.finished = true;
        }
        Some(item)
    }
}

impl<F, T> std::iter::FusedIterator for MappedRows<'_, F> where F: FnMut(&Row<'_>) -> Result<T> {}
