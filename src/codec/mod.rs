//! Text forms of a [`Document`](crate::types::Document)
//!
//! - [`yaml`]: nested mappings, one per item, with `children` for group bodies
//! - [`markdown`]: headings per sheet and nested bullet lists
//!
//! Both emit keys in the order given by [`crate::core::ordering`], so
//! serializing an unchanged document always yields the same text.

pub mod markdown;
pub mod yaml;

use crate::core::ordering::{order_keys, SheetKind, COMMENT};
use crate::types::Record;

/// Emission order for one record: attributes per the ordering table, with
/// the comment (`#`) last when present.
pub(crate) fn record_keys(record: &Record, kind: SheetKind) -> Vec<&str> {
    let keys = record
        .attributes
        .keys()
        .map(String::as_str)
        .chain(record.comment.is_some().then_some(COMMENT));
    order_keys(kind, keys)
}
