//! `code` commands over the code registry.

use std::path::Path;

use anyhow::anyhow;
use teenet_registry::CodeRegistry;
use teenet_registry::LocalWallet;
use teenet_types::hex32;
use teenet_types::parse_bytes32;
use teenet_types::Code;
use teenet_types::CodeFile;
use teenet_types::CodeHash;

use crate::output::Output;
use crate::task::read_json;

fn parse_hash(hash: &str) -> anyhow::Result<CodeHash> {
    parse_bytes32(hash).ok_or_else(|| anyhow!("Invalid code hash\nhash={hash}"))
}

fn print_code(
    out: &dyn Output,
    code: &Code,
) {
    out.log(&format!("Hash: {}\nUrl: {}", hex32(&code.hash), code.url));
}

/// `code get`
pub async fn get<R: CodeRegistry + ?Sized>(
    registry: &R,
    out: &dyn Output,
    hash: &str,
) -> anyhow::Result<Code> {
    let hash = parse_hash(hash)?;
    let code = registry
        .get_code(hash)
        .await?
        .ok_or_else(|| anyhow!("Code hash={} does not exist", hex32(&hash)))?;
    out.log("Code info:");
    print_code(out, &code);
    Ok(code)
}

/// `code add-or-update`
pub async fn add_or_update<R: CodeRegistry + ?Sized>(
    registry: &R,
    out: &dyn Output,
    signer: &LocalWallet,
    file: &Path,
) -> anyhow::Result<()> {
    let code: CodeFile = read_json(file)?;
    registry
        .add_or_update(signer, &code)
        .await?;
    out.log("Added/updated code info:");
    print_code(out, &code);
    Ok(())
}

/// `code remove`
pub async fn remove<R: CodeRegistry + ?Sized>(
    registry: &R,
    out: &dyn Output,
    signer: &LocalWallet,
    hash: &str,
) -> anyhow::Result<()> {
    let hash = parse_hash(hash)?;
    registry
        .remove(signer, hash)
        .await?;
    out.log(&format!("Removed code info with hash={}", hex32(&hash)));
    Ok(())
}
