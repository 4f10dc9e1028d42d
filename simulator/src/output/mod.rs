pub mod filterbank;

pub use filterbank::FilterbankWriter;
