pub mod closure;
pub mod contact;
pub mod election;
pub mod journal;
pub mod ledger;
pub mod member;
pub mod organization;
pub mod politician;
pub mod sub_account;
pub mod transfer;

use serde::{Deserialize, Deserializer};

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`) in partial updates. Pair with `#[serde(default)]`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
