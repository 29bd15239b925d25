pub mod card_reader;
pub mod fee_reader;
pub mod wallet_reader;
pub mod wallet_writer;
