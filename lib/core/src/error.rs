//! Error handling foundation for parley.
//!
//! Only the `Result` alias lives here. Each crate defines its own error
//! enums and returns them wrapped in a rootcause `Report`.

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Boom;

    impl std::fmt::Display for Boom {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "boom")
        }
    }

    impl std::error::Error for Boom {}

    fn fails() -> Result<(), Boom> {
        Err(Boom.into())
    }

    #[test]
    fn result_carries_report() {
        let err = fails().unwrap_err();
        assert!(err.to_string().contains("boom"));
    }
}
