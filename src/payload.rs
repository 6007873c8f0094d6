use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Inline button payloads. The string form round-trips through Telegram, so
/// the encoding must stay stable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CallbackData {
    /// Ask for confirmation before deleting a note.
    Confirm(i64),
    /// Confirmed deletion of a note.
    Delete(i64),
    CancelDelete,
    /// Category chosen for the next note; `None` is "no category".
    Category(Option<i64>),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognized callback payload `{0}`")]
pub(crate) struct PayloadError(String);

impl fmt::Display for CallbackData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackData::Confirm(id) => write!(f, "confirm_{id}"),
            CallbackData::Delete(id) => write!(f, "delete_{id}"),
            CallbackData::CancelDelete => f.write_str("cancel_delete"),
            CallbackData::Category(Some(id)) => write!(f, "cat_{id}"),
            CallbackData::Category(None) => f.write_str("cat_none"),
        }
    }
}

impl FromStr for CallbackData {
    type Err = PayloadError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let invalid = || PayloadError(data.to_string());

        if data == "cancel_delete" {
            return Ok(CallbackData::CancelDelete);
        }

        let (kind, value) = data.split_once('_').ok_or_else(invalid)?;
        let id = || value.parse::<i64>().map_err(|_| invalid());
        match kind {
            "confirm" => Ok(CallbackData::Confirm(id()?)),
            "delete" => Ok(CallbackData::Delete(id()?)),
            "cat" if value == "none" => Ok(CallbackData::Category(None)),
            "cat" => Ok(CallbackData::Category(Some(id()?))),
            _ => Err(invalid()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_stable_strings() {
        assert_eq!(CallbackData::Confirm(12).to_string(), "confirm_12");
        assert_eq!(CallbackData::Delete(12).to_string(), "delete_12");
        assert_eq!(CallbackData::CancelDelete.to_string(), "cancel_delete");
        assert_eq!(CallbackData::Category(Some(3)).to_string(), "cat_3");
        assert_eq!(CallbackData::Category(None).to_string(), "cat_none");
    }

    #[test]
    fn decodes_known_shapes() {
        assert_eq!("delete_7".parse(), Ok(CallbackData::Delete(7)));
        assert_eq!("cat_none".parse(), Ok(CallbackData::Category(None)));
        assert_eq!("cat_42".parse(), Ok(CallbackData::Category(Some(42))));
        assert_eq!("cancel_delete".parse(), Ok(CallbackData::CancelDelete));
    }

    #[test]
    fn rejects_unknown_shapes() {
        for data in ["", "confirm", "confirm_", "confirm_x", "delete_1_2", "cat_", "undo_1", "cancel"] {
            assert!(data.parse::<CallbackData>().is_err(), "{data} should be rejected");
        }
    }
}
