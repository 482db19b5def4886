//! Error type shared by the whole crate.
//!
//! Most failure modes of card rendering are recovered locally (bad colors,
//! undecodable photos, missing fonts). Only the final encode, and the
//! explicit loading entry points, report errors to the caller.

use std::path::PathBuf;

pub type CardResult<T> = Result<T, CardError>;

#[derive(thiserror::Error, Debug)]
pub enum CardError {
    #[error("failed to encode card image: {0}")]
    Encode(#[source] image::ImageError),

    #[error("failed to load font {}: {reason}", path.display())]
    FontLoad { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("model reply does not contain a json object")]
    MissingJsonObject,
}

impl CardError {
    pub fn font_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::FontLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        let err = CardError::font_load("/fonts/missing.ttf", "no such file");
        let msg = err.to_string();
        assert!(msg.contains("failed to load font"));
        assert!(msg.contains("/fonts/missing.ttf"));
        assert!(msg.contains("no such file"));

        assert!(
            CardError::MissingJsonObject
                .to_string()
                .contains("json object")
        );
    }

    #[test]
    fn json_errors_convert() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: CardError = parse_err.into();
        assert!(matches!(err, CardError::Json(_)));
        assert!(err.to_string().starts_with("invalid json:"));
    }
}
