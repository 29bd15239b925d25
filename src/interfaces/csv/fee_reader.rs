use crate::domain::fee::Fee;
use crate::error::{Result, SpendError};
use std::io::Read;

/// Reads fee catalog rows (`identifier, channel, fee, is_percent, is_dollar`) from CSV.
pub struct FeeReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> FeeReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn fees(self) -> impl Iterator<Item = Result<Fee>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(SpendError::from))
    }
}
