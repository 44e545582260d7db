use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{common::national_id::NationalId, db::vote::VoteKey, mongodb::Id};

/// Every receipt starts with this, followed by `-`.
pub const RECEIPT_PREFIX: &str = "receipt";

/// Anything shorter than this cannot be a receipt.
pub const MIN_RECEIPT_LENGTH: usize = 10;

/// A vote receipt: `receipt-{nationalId}-{groupId}-{timestampMillis}`.
///
/// A receipt only points at a vote key. It carries no signature, so anyone who
/// knows a voter's national ID and a group ID can build one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Receipt {
    pub national_id: NationalId,
    pub group_id: Id,
    /// Whatever followed the group ID; normally milliseconds since the epoch.
    stamp: String,
}

impl Receipt {
    pub fn new(national_id: NationalId, group_id: Id, timestamp_millis: i64) -> Self {
        Self {
            national_id,
            group_id,
            stamp: timestamp_millis.to_string(),
        }
    }

    /// The key of the vote this receipt refers to.
    pub fn vote_key(&self) -> VoteKey {
        VoteKey::new(&self.national_id, self.group_id)
    }
}

impl Display for Receipt {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{RECEIPT_PREFIX}-{}-{}-{}",
            self.national_id, self.group_id, self.stamp
        )
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReceiptError {
    #[error("Invalid receipt format: too short")]
    TooShort,
    #[error("Invalid receipt format: must start with '{RECEIPT_PREFIX}-'")]
    MissingPrefix,
    #[error("Invalid receipt format: expected at least 4 '-'-separated parts")]
    TooFewParts,
    #[error("Invalid receipt format: bad national ID")]
    NationalId,
    #[error("Invalid receipt format: bad group ID")]
    GroupId,
}

impl FromStr for Receipt {
    type Err = ReceiptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() < MIN_RECEIPT_LENGTH {
            return Err(ReceiptError::TooShort);
        }
        let rest = s
            .strip_prefix(RECEIPT_PREFIX)
            .and_then(|rest| rest.strip_prefix('-'))
            .ok_or(ReceiptError::MissingPrefix)?;
        let mut parts = rest.splitn(3, '-');
        let (national_id, group_id, stamp) = match (parts.next(), parts.next(), parts.next()) {
            (Some(national_id), Some(group_id), Some(stamp)) => (national_id, group_id, stamp),
            _ => return Err(ReceiptError::TooFewParts),
        };
        Ok(Self {
            national_id: national_id.parse().map_err(|_| ReceiptError::NationalId)?,
            group_id: group_id.parse().map_err(|_| ReceiptError::GroupId)?,
            stamp: stamp.to_string(),
        })
    }
}

impl TryFrom<String> for Receipt {
    type Error = ReceiptError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Receipt> for String {
    fn from(receipt: Receipt) -> Self {
        receipt.to_string()
    }
}
