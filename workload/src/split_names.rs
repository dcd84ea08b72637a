//! Lists every split by name. Each split contributes the value `1` once, so
//! a name followed by anything but a single `1` means a split was lost or
//! mapped twice.

use anyhow::Result;
use bytes::Bytes;

use mrl_engine::{MapContext, ReduceContext, Split};

pub fn map(split: &Split, ctx: &MapContext<'_>) -> Result<()> {
    ctx.emit(split.id.as_bytes(), b"1");
    Ok(())
}

/// Writes the split name followed by its concatenated values.
pub fn reduce(key: &Bytes, ctx: &mut ReduceContext<'_>) -> Result<()> {
    let mut joined = Vec::new();
    while let Some(value) = ctx.next_value(key) {
        joined.extend_from_slice(&value);
    }

    ctx.write(key);
    ctx.write(b" ");
    ctx.write(joined);
    ctx.write(b"\n");
    Ok(())
}
