use crate::{IdGenStatus, Result, SonyflakeGenerator, SonyflakeId, TimeSource, ticks_to_duration};

impl<T> SonyflakeGenerator<T>
where
    T: TimeSource,
{
    /// Generates the next ID, yielding to the tokio runtime with
    /// [`tokio::time::sleep`] while the generator is pending.
    ///
    /// The lock is never held across an await point.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Self::try_poll_id`].
    pub async fn next_id_async(&self) -> Result<SonyflakeId> {
        loop {
            let dur = match self.try_poll_id()? {
                IdGenStatus::Ready { id } => return Ok(id),
                IdGenStatus::Pending { yield_for } => ticks_to_duration(yield_for),
            };
            tokio::time::sleep(dur).await;
        }
    }
}
