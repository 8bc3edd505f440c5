pub mod kraken;

pub use kraken::KrakenProvider;
