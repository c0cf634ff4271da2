//! Token metadata resolution
//!
//! Reads the Metaplex metadata PDA and walks its layout by hand; the account
//! prefix up to `is_mutable` is stable across metadata versions. The off-chain
//! URI document supplies description and image when reachable, and a small
//! built-in table covers the majors that predate on-chain metadata.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use tracing::debug;

use crate::infrastructure::rpc::ChainRpc;
use crate::shared::constants::TOKEN_METADATA_PROGRAM_ID;
use crate::shared::errors::{AppError, ParseError};
use crate::shared::types::TokenMetadata;

static KNOWN_TOKENS: Lazy<HashMap<&'static str, (&'static str, &'static str)>> = Lazy::new(|| {
    HashMap::from([
        (
            "So11111111111111111111111111111111111111112",
            ("Wrapped SOL", "SOL"),
        ),
        (
            "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
            ("USD Coin", "USDC"),
        ),
        (
            "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB",
            ("USDT", "USDT"),
        ),
    ])
});

#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn fetch(&self, mint: &Pubkey) -> Result<TokenMetadata, AppError>;
}

/// Name, symbol, uri and mutability decoded from the metadata account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnChainMetadata {
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub is_mutable: bool,
}

/// Off-chain JSON document pointed to by the metadata uri
#[derive(Debug, Deserialize, Default)]
struct UriDocument {
    description: Option<String>,
    image: Option<String>,
    extensions: Option<serde_json::Value>,
}

pub fn metadata_pda(mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[
            b"metadata",
            TOKEN_METADATA_PROGRAM_ID.as_ref(),
            mint.as_ref(),
        ],
        &TOKEN_METADATA_PROGRAM_ID,
    )
    .0
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ParseError> {
        let end = self.pos + n;
        let slice = self
            .data
            .get(self.pos..end)
            .ok_or(ParseError::AccountDataTooShort {
                have: self.data.len(),
                need: end,
            })?;
        self.pos = end;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, ParseError> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32, ParseError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Borsh string: u32 length prefix, then utf8 bytes padded with NULs
    fn read_string(&mut self) -> Result<String, ParseError> {
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?;
        Ok(String::from_utf8_lossy(bytes)
            .trim_end_matches('\0')
            .to_string())
    }
}

/// Decode the stable prefix of a Metaplex metadata account
pub fn parse_metadata_account(data: &[u8]) -> Result<OnChainMetadata, ParseError> {
    let mut cursor = Cursor::new(data);
    cursor.read_u8()?; // key
    cursor.take(32)?; // update authority
    cursor.take(32)?; // mint

    let name = cursor.read_string()?;
    let symbol = cursor.read_string()?;
    let uri = cursor.read_string()?;
    cursor.take(2)?; // seller fee basis points

    // Option<Vec<Creator>>, each creator 32 + 1 + 1 bytes
    if cursor.read_u8()? == 1 {
        let count = cursor.read_u32()? as usize;
        cursor.take(count * 34)?;
    }

    cursor.read_u8()?; // primary sale happened
    let is_mutable = cursor.read_u8()? == 1;

    Ok(OnChainMetadata {
        name,
        symbol,
        uri,
        is_mutable,
    })
}

pub struct ChainMetadataSource {
    rpc: Arc<dyn ChainRpc>,
    http: reqwest::Client,
}

impl ChainMetadataSource {
    pub fn new(rpc: Arc<dyn ChainRpc>) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Config(format!("http client: {e}")))?;
        Ok(Self { rpc, http })
    }

    async fn fetch_uri_document(&self, uri: &str) -> Option<UriDocument> {
        if uri.is_empty() {
            return None;
        }
        match self.http.get(uri).send().await {
            Ok(response) => response.json().await.ok(),
            Err(err) => {
                debug!(uri, error = %err, "metadata uri fetch failed");
                None
            }
        }
    }

    async fn fetch_on_chain(&self, mint: &Pubkey) -> Result<TokenMetadata, AppError> {
        let data = self.rpc.get_account_data(&metadata_pda(mint)).await?;
        let on_chain = parse_metadata_account(&data)?;

        // The uri document is best-effort extra detail
        let document = self.fetch_uri_document(&on_chain.uri).await.unwrap_or_default();

        Ok(TokenMetadata {
            name: Some(on_chain.name),
            symbol: Some(on_chain.symbol),
            image: document.image,
            is_mutable: on_chain.is_mutable,
            description: document.description,
            extensions: document.extensions,
        })
    }
}

#[async_trait]
impl MetadataSource for ChainMetadataSource {
    /// On-chain registry first; the built-in table only covers mints with
    /// no metadata account.
    async fn fetch(&self, mint: &Pubkey) -> Result<TokenMetadata, AppError> {
        match self.fetch_on_chain(mint).await {
            Ok(meta) => Ok(meta),
            Err(err) => {
                if let Some((name, symbol)) = KNOWN_TOKENS.get(mint.to_string().as_str()) {
                    debug!(mint = %mint, "metadata account missing, using built-in entry");
                    return Ok(TokenMetadata {
                        name: Some(name.to_string()),
                        symbol: Some(symbol.to_string()),
                        ..TokenMetadata::default()
                    });
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::rpc::testing::StaticRpc;

    fn push_string(buf: &mut Vec<u8>, value: &str, padded_len: usize) {
        buf.extend_from_slice(&(padded_len as u32).to_le_bytes());
        let mut bytes = value.as_bytes().to_vec();
        bytes.resize(padded_len, 0);
        buf.extend_from_slice(&bytes);
    }

    fn metadata_bytes(name: &str, symbol: &str, uri: &str, is_mutable: bool) -> Vec<u8> {
        let mut buf = vec![4u8]; // key
        buf.extend_from_slice(&[0u8; 64]); // update authority + mint
        push_string(&mut buf, name, 32);
        push_string(&mut buf, symbol, 10);
        push_string(&mut buf, uri, 200);
        buf.extend_from_slice(&500u16.to_le_bytes());
        // one creator
        buf.push(1);
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&[0u8; 34]);
        buf.push(0); // primary sale
        buf.push(is_mutable as u8);
        buf
    }

    #[test]
    fn test_parse_metadata_account() {
        let data = metadata_bytes("My Token", "MTK", "https://example.com/meta.json", true);
        let parsed = parse_metadata_account(&data).unwrap();
        assert_eq!(parsed.name, "My Token");
        assert_eq!(parsed.symbol, "MTK");
        assert_eq!(parsed.uri, "https://example.com/meta.json");
        assert!(parsed.is_mutable);
    }

    #[test]
    fn test_parse_metadata_without_creators() {
        let mut buf = vec![4u8];
        buf.extend_from_slice(&[0u8; 64]);
        push_string(&mut buf, "Bare", 32);
        push_string(&mut buf, "BARE", 10);
        push_string(&mut buf, "", 200);
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.push(0); // no creators
        buf.push(0);
        buf.push(0); // immutable

        let parsed = parse_metadata_account(&buf).unwrap();
        assert_eq!(parsed.symbol, "BARE");
        assert!(!parsed.is_mutable);
    }

    #[test]
    fn test_truncated_account_rejected() {
        let err = parse_metadata_account(&[4u8; 40]).unwrap_err();
        assert!(matches!(err, ParseError::AccountDataTooShort { .. }));
    }

    #[test]
    fn test_metadata_pda_is_deterministic() {
        let mint = Pubkey::new_unique();
        assert_eq!(metadata_pda(&mint), metadata_pda(&mint));
    }

    #[tokio::test]
    async fn test_registry_wins_over_builtin_table() {
        let wsol = crate::shared::constants::WSOL_MINT;
        let mut rpc = StaticRpc::default();
        rpc.accounts.insert(
            metadata_pda(&wsol),
            metadata_bytes("On Chain SOL", "OCS", "", true),
        );

        let source = ChainMetadataSource::new(Arc::new(rpc)).unwrap();
        let meta = source.fetch(&wsol).await.unwrap();
        assert_eq!(meta.name.as_deref(), Some("On Chain SOL"));
        assert_eq!(meta.symbol.as_deref(), Some("OCS"));
    }

    #[tokio::test]
    async fn test_builtin_table_covers_missing_account() {
        let wsol = crate::shared::constants::WSOL_MINT;
        let source = ChainMetadataSource::new(Arc::new(StaticRpc::default())).unwrap();
        let meta = source.fetch(&wsol).await.unwrap();
        assert_eq!(meta.name.as_deref(), Some("Wrapped SOL"));
        assert_eq!(meta.symbol.as_deref(), Some("SOL"));
    }

    #[tokio::test]
    async fn test_unknown_mint_without_account_fails() {
        let source = ChainMetadataSource::new(Arc::new(StaticRpc::default())).unwrap();
        let err = source.fetch(&Pubkey::new_unique()).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
