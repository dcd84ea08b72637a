//! Word count.

use anyhow::Result;
use bytes::Bytes;

use common::utils::u64_from_bytes;
use mrl_engine::{MapContext, ReduceContext, Split};

/// Emits `(word, 1)` for every alphanumeric run in the split.
pub fn map(split: &Split, ctx: &MapContext<'_>) -> Result<()> {
    let contents = split.read()?;
    let text = String::from_utf8_lossy(&contents);

    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .for_each(|word| ctx.emit(word, "1"));
    Ok(())
}

pub fn reduce(key: &Bytes, ctx: &mut ReduceContext<'_>) -> Result<()> {
    let partition = ctx.partition();
    let mut count = 0u64;
    while let Some(value) = ctx.get_next(key, partition)? {
        count += u64_from_bytes(&value)?;
    }

    ctx.write(key);
    ctx.write(format!(" {count}\n"));
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::testing;

    #[test]
    fn counts_words_across_splits() {
        let workload = crate::try_named("wc").unwrap();
        let report = testing::run(
            workload,
            &["the cat sat\non the mat", "The cat, again."],
            4,
        );

        assert_eq!(
            testing::lines(&report),
            ["The 1", "again 1", "cat 2", "mat 1", "on 1", "sat 1", "the 2"]
        );
        assert_eq!(report.stats.records, 9);
    }
}
