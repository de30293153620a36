mod verbosity;

pub use verbosity::Verbosity;
