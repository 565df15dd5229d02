use crate::domain::errors::ForecastError;

const MAX_SYMBOL_LEN: usize = 32;

/// Accepts ticker-style symbols: ASCII letters, digits and `.`, `-`, `_`, `^`, `=`,
/// not starting with a dot. Symbols name artifact files, so nothing else gets through.
pub fn validate_symbol(symbol: &str) -> Result<(), ForecastError> {
    let valid = !symbol.is_empty()
        && symbol.len() <= MAX_SYMBOL_LEN
        && !symbol.starts_with('.')
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '^' | '='));

    if valid {
        Ok(())
    } else {
        Err(ForecastError::InvalidInput {
            reason: format!("invalid symbol {:?}", symbol),
        })
    }
}

/// Canonical form used for artifact keys: surrounding whitespace dropped,
/// ASCII uppercased, then validated.
pub fn normalize_symbol(symbol: &str) -> Result<String, ForecastError> {
    let normalized = symbol.trim().to_ascii_uppercase();
    validate_symbol(&normalized)?;
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticker_symbols_accepted() {
        for symbol in ["AAPL", "BRK.B", "^GSPC", "EURUSD=X", "BTC-USD"] {
            assert!(validate_symbol(symbol).is_ok(), "{}", symbol);
        }
    }

    #[test]
    fn test_path_like_symbols_rejected() {
        for symbol in ["", "../etc", "a/b", ".hidden", "A B", "AAPL\n"] {
            assert!(
                matches!(validate_symbol(symbol), Err(ForecastError::InvalidInput { .. })),
                "{:?}",
                symbol
            );
        }
    }

    #[test]
    fn test_normalize_uppercases_and_trims() {
        assert_eq!(normalize_symbol("aapl").unwrap(), "AAPL");
        assert_eq!(normalize_symbol(" brk.b\n").unwrap(), "BRK.B");
        assert_eq!(normalize_symbol("EURUSD=X").unwrap(), "EURUSD=X");
        assert!(matches!(
            normalize_symbol("  "),
            Err(ForecastError::InvalidInput { .. })
        ));
        assert!(normalize_symbol("../aapl").is_err());
    }
}
