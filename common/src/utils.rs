use anyhow::Result;
use bytes::Bytes;

/// Converts bytes into an owned UTF-8 string.
pub fn string_from_bytes(bytes: Bytes) -> Result<String> {
    Ok(String::from_utf8(bytes.into())?)
}

/// Parses a decimal integer stored as UTF-8 bytes.
pub fn u64_from_bytes(bytes: &[u8]) -> Result<u64> {
    Ok(std::str::from_utf8(bytes)?.trim().parse::<u64>()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_counts() {
        assert_eq!(u64_from_bytes(b"42").unwrap(), 42);
        assert_eq!(u64_from_bytes(b" 7\n").unwrap(), 7);
        assert!(u64_from_bytes(b"seven").is_err());
    }

    #[test]
    fn rejects_invalid_utf8() {
        assert!(string_from_bytes(Bytes::from_static(&[0xc3, 0x28])).is_err());
        assert_eq!(string_from_bytes(Bytes::from("ok")).unwrap(), "ok");
    }
}
