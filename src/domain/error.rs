//! Domain error types.

/// Top-level error type for gridtrader.
#[derive(Debug, thiserror::Error)]
pub enum GridtraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("empty K-line series: a backtest needs at least one bar")]
    EmptyKline,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&GridtraderError> for std::process::ExitCode {
    fn from(err: &GridtraderError) -> Self {
        let code: u8 = match err {
            GridtraderError::Io(_) => 1,
            GridtraderError::ConfigParse { .. }
            | GridtraderError::ConfigMissing { .. }
            | GridtraderError::ConfigInvalid { .. } => 2,
            GridtraderError::Data { .. } => 3,
            GridtraderError::EmptyKline => 4,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = GridtraderError::ConfigMissing {
            section: "grid".into(),
            key: "base_price".into(),
        };
        assert_eq!(err.to_string(), "missing config key [grid] base_price");

        let err = GridtraderError::EmptyKline;
        assert!(err.to_string().contains("at least one bar"));
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::other("boom");
        let err: GridtraderError = io.into();
        assert!(matches!(err, GridtraderError::Io(_)));
    }
}
