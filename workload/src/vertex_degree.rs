//! A MapReduce-compatible application that computes the
//! degree of each vertex in a graph, given a list of edges.
//!

use anyhow::{anyhow, Result};
use bytes::{BufMut, Bytes, BytesMut};

use common::utils::{string_from_bytes, u64_from_bytes};
use mrl_engine::{MapContext, ReduceContext, Split};

fn parse_line(line: &str) -> Result<(u64, u64)> {
    let mut iter = line.split_whitespace().take(2);
    let a = iter
        .next()
        .ok_or_else(|| anyhow!("Invalid input file format"))?
        .parse()?;
    let b = iter
        .next()
        .ok_or_else(|| anyhow!("Invalid input file format"))?
        .parse()?;
    Ok((a, b))
}

/// Emits `(vertex, 1)` for both ends of every edge.
pub fn map(split: &Split, ctx: &MapContext<'_>) -> Result<()> {
    let s = string_from_bytes(split.read()?)?;
    let edges = s
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(parse_line)
        .collect::<Result<Vec<_>>>()?;

    for (a, b) in edges {
        ctx.emit(a.to_string(), "1");
        ctx.emit(b.to_string(), "1");
    }
    Ok(())
}

pub fn reduce(key: &Bytes, ctx: &mut ReduceContext<'_>) -> Result<()> {
    let mut count = 0u64;
    for value in ctx.values(key) {
        count += u64_from_bytes(&value)?;
    }

    let mut value = BytesMut::with_capacity(24);
    let vertex_no = String::from_utf8(key.to_vec())?;
    value.put(format!("{}, deg={}\n", &vertex_no, count).as_bytes());
    ctx.write(value.freeze());
    Ok(())
}
