//! Fixed-layout decoder for pump-swap pool ("market") accounts
//!
//! Layout (little-endian):
//!
//! | offset | size | field                      |
//! |--------|------|----------------------------|
//! | 0      | 8    | discriminator              |
//! | 8      | 1    | pool_bump                  |
//! | 9      | 2    | index                      |
//! | 11     | 32   | creator                    |
//! | 43     | 32   | base_mint                  |
//! | 75     | 32   | quote_mint                 |
//! | 107    | 32   | lp_mint                    |
//! | 139    | 32   | pool_base_token_account    |
//! | 171    | 32   | pool_quote_token_account   |
//! | 203    | 8    | lp_supply                  |
//!
//! The discriminator is matched server-side by the subscription filter and
//! is not re-checked here.

use super::errors::DecodeError;
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;

/// Pool account discriminator (first 8 bytes of every market account)
pub const MARKET_DISCRIMINATOR: [u8; 8] = [0xf1, 0x9a, 0x6d, 0x04, 0x11, 0xb1, 0x6d, 0xbc];

/// Minimum length of a market account: 8 + 1 + 2 + 32 * 6 + 8
pub const MARKET_ACCOUNT_LEN: usize = 211;

/// Offset of the first field after the discriminator
pub const FIELDS_OFFSET: usize = 8;

/// Offset of `quote_mint`, used by the server-side memcmp filter
pub const QUOTE_MINT_OFFSET: usize = 75;

/// Decoded snapshot of one market account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketRecord {
    pub pool_bump: u8,
    pub index: u16,
    pub creator: Pubkey,
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub lp_mint: Pubkey,
    pub pool_base_token_account: Pubkey,
    pub pool_quote_token_account: Pubkey,
    /// Serialized as a decimal string so it survives JSON consumers
    #[serde(serialize_with = "serialize_u64_as_string")]
    pub lp_supply: u64,
}

fn serialize_u64_as_string<S: serde::Serializer>(v: &u64, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(v)
}

/// Bounds-checked forward reader over account bytes
struct Reader<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8], offset: usize) -> Self {
        Self { buf, offset }
    }

    #[inline]
    fn take<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let available = self.buf.len().saturating_sub(self.offset);
        if available < N {
            return Err(DecodeError::Truncated {
                offset: self.offset,
                needed: N,
                available,
            });
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.offset..self.offset + N]);
        self.offset += N;
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take::<1>()?[0])
    }

    fn u16_le(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_le_bytes(self.take()?))
    }

    fn u64_le(&mut self) -> Result<u64, DecodeError> {
        Ok(u64::from_le_bytes(self.take()?))
    }

    fn pubkey(&mut self) -> Result<Pubkey, DecodeError> {
        Ok(Pubkey::new_from_array(self.take()?))
    }
}

/// Decode a market account from raw account data
///
/// Never returns a partially-populated record: the first short read fails
/// the whole decode with [`DecodeError::Truncated`].
pub fn decode(buf: &[u8]) -> Result<MarketRecord, DecodeError> {
    let mut r = Reader::new(buf, FIELDS_OFFSET);

    Ok(MarketRecord {
        pool_bump: r.u8()?,
        index: r.u16_le()?,
        creator: r.pubkey()?,
        base_mint: r.pubkey()?,
        quote_mint: r.pubkey()?,
        lp_mint: r.pubkey()?,
        pool_base_token_account: r.pubkey()?,
        pool_quote_token_account: r.pubkey()?,
        lp_supply: r.u64_le()?,
    })
}
