//! src/page/codec.rs
//! Page authentication and AES-256-CBC decryption

use crate::aliases::{Aes256Key32, Block16, HmacSha512, Iv16, MacKey32, PageTag64};
use crate::consts::{BLOCK_SIZE, IV_SIZE, PAGE_SIZE, SALT_SIZE, SQLITE_HEADER};
use crate::error::DecryptError;
use crate::kdf::KeyContext;
use crate::page::layout::PageLayout;
use crate::utils::{is_zero_page, xor_blocks};
use aes::cipher::{BlockDecrypt, KeyInit};
use aes::{Aes256Dec, Block as AesBlock};
use hmac::Mac;

#[inline(always)]
fn page_mac(
    mac_key: &MacKey32,
    cipher_region: &[u8],
    iv: &[u8],
    layout: PageLayout,
) -> Result<HmacSha512, DecryptError> {
    let mut mac = <HmacSha512 as Mac>::new_from_slice(mac_key.expose_secret())
        .map_err(|e| DecryptError::Crypto(format!("HMAC init failed: {e}")))?;
    mac.update(cipher_region);
    mac.update(iv);
    mac.update(&layout.page_number().to_le_bytes());
    Ok(mac)
}

/// HMAC-SHA512 over `cipher_region || iv || le32(page_index + 1)`.
///
/// This is the tag stored in the last 64 bytes of every page.
pub fn compute_page_tag(
    mac_key: &MacKey32,
    cipher_region: &[u8],
    iv: &Iv16,
    page_index: u32,
) -> Result<PageTag64, DecryptError> {
    let mac = page_mac(
        mac_key,
        cipher_region,
        iv.expose_secret(),
        PageLayout::for_index(page_index),
    )?;
    let mut tag = PageTag64::new([0u8; 64]);
    tag.expose_secret_mut()
        .copy_from_slice(mac.finalize().into_bytes().as_slice());
    Ok(tag)
}

/// Check the stored tag of one page in constant time.
///
/// A mismatch on page 0 is reported as [`DecryptError::KeyValidationFailed`]
/// (the caller-actionable "wrong key" case), on any later page as
/// [`DecryptError::PageCorrupt`].
pub fn verify_page(
    page: &[u8; PAGE_SIZE],
    keys: &KeyContext,
    page_index: u32,
) -> Result<(), DecryptError> {
    let layout = PageLayout::for_index(page_index);
    let mac = page_mac(
        keys.mac_key(),
        &page[layout.cipher_range()],
        &page[layout.iv_range()],
        layout,
    )?;

    mac.verify_slice(&page[layout.tag_range()]).map_err(|_| {
        tracing::warn!(page = page_index, "page authentication failed");
        if page_index == 0 {
            DecryptError::KeyValidationFailed
        } else {
            DecryptError::PageCorrupt(page_index)
        }
    })
}

/// CBC-decrypt `ciphertext` (a whole number of blocks) into `out`.
#[inline(always)]
fn decrypt_cbc(ciphertext: &[u8], key: &Aes256Key32, iv: &Iv16, out: &mut [u8]) {
    let cipher = Aes256Dec::new(key.expose_secret().into());
    let mut previous = Block16::new(*iv.expose_secret());

    for (src, dst) in ciphertext
        .chunks_exact(BLOCK_SIZE)
        .zip(out.chunks_exact_mut(BLOCK_SIZE))
    {
        let mut block = AesBlock::clone_from_slice(src);
        cipher.decrypt_block(&mut block);
        xor_blocks(block.as_slice(), previous.expose_secret(), dst);
        previous.expose_secret_mut().copy_from_slice(src);
    }
}

/// Decrypt one page into `out` and return the number of bytes written.
///
/// - all-zero page: copied unchanged (4096 bytes), never validated
/// - otherwise: decrypted body followed by the untouched 80-byte reserve
///   region (4080 bytes on page 0, 4096 on later pages)
///
/// `validate` is ignored for page 0, which is always authenticated. On an
/// authentication failure nothing is written.
pub fn decrypt_page(
    page: &[u8; PAGE_SIZE],
    keys: &KeyContext,
    page_index: u32,
    validate: bool,
    out: &mut [u8],
) -> Result<usize, DecryptError> {
    if is_zero_page(page) {
        if out.len() < PAGE_SIZE {
            return Err(DecryptError::Crypto("page output buffer too small".into()));
        }
        out[..PAGE_SIZE].copy_from_slice(page);
        return Ok(PAGE_SIZE);
    }

    let layout = PageLayout::for_index(page_index);
    if out.len() < layout.output_len() {
        return Err(DecryptError::Crypto("page output buffer too small".into()));
    }

    if validate || page_index == 0 {
        verify_page(page, keys, page_index)?;
    }

    let mut iv = Iv16::new([0u8; IV_SIZE]);
    iv.expose_secret_mut()
        .copy_from_slice(&page[layout.iv_range()]);

    let body_len = layout.body_len();
    decrypt_cbc(
        &page[layout.cipher_range()],
        keys.enc_key(),
        &iv,
        &mut out[..body_len],
    );
    out[body_len..layout.output_len()].copy_from_slice(&page[layout.reserve_range()]);

    tracing::trace!(page = page_index, validated = validate || page_index == 0, "page decrypted");
    Ok(layout.output_len())
}

/// Produce the full 4096-byte plaintext page as it appears in a standard
/// database file.
///
/// Page 0 starts with the plaintext magic header in place of the salt,
/// followed by the 4000-byte body and the 80-byte reserve. All other pages
/// are exactly what [`decrypt_page`] writes. Sentinel pages stay all-zero.
pub fn reconstruct_page(
    page: &[u8; PAGE_SIZE],
    keys: &KeyContext,
    page_index: u32,
    validate: bool,
    out: &mut [u8; PAGE_SIZE],
) -> Result<(), DecryptError> {
    if page_index == 0 && !is_zero_page(page) {
        decrypt_page(page, keys, 0, true, &mut out[SALT_SIZE..])?;
        out[..SALT_SIZE].copy_from_slice(SQLITE_HEADER);
    } else {
        decrypt_page(page, keys, page_index, validate, out)?;
    }
    Ok(())
}
