//! tests/common.rs
//! Fixture builder shared across test files: the inverse of the page codec,
//! so every test container is produced from a known plaintext image.

#![allow(dead_code)] // each test binary uses a different subset

use aes::cipher::{BlockEncrypt, KeyInit};
use aes::{Aes256Enc, Block};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use wxdb_rs::aliases::{Iv16, Salt16};
use wxdb_rs::consts::{HMAC_OFFSET, PAGE_SIZE, RESERVE_OFFSET, SALT_SIZE, SQLITE_HEADER};
use wxdb_rs::page::{compute_page_tag, PageLayout};
use wxdb_rs::utils::{decode_raw_key, xor_blocks};
use wxdb_rs::{derive_keys, KdfParams, KeyContext};

/// Fast KDF for tests - the real 256000-round derivation is covered by benches/
pub const TEST_KDF: KdfParams = KdfParams::new(16, 2);

pub const TEST_KEY: &str = "6b1f0c5e2a9d4873b0c1d2e3f4a5b6c7d8e9f00112233445566778899aabbccd";
pub const OTHER_KEY: &str = "00112233445566778899aabbccddeeff00112233445566778899aabbccddeeff";

pub const TEST_SALT: [u8; SALT_SIZE] = [
    0x9e, 0x41, 0x07, 0xd3, 0x5c, 0x88, 0x21, 0xfa, 0x36, 0x6b, 0x10, 0xc4, 0x7d, 0xe2, 0x53, 0x0f,
];

pub fn keys_for(hex_key: &str, salt: [u8; SALT_SIZE], params: &KdfParams) -> KeyContext {
    let raw = decode_raw_key(hex_key).expect("test key");
    derive_keys(&raw, &Salt16::new(salt), params).expect("derive")
}

/// Plaintext database image: magic header, deterministic pseudo-random page
/// bodies, and all-zero pages at `zero_pages`.
pub fn sample_plaintext(pages: usize, seed: u64, zero_pages: &[usize]) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut image = vec![0u8; pages * PAGE_SIZE];
    rng.fill(&mut image[..]);
    for &page in zero_pages {
        image[page * PAGE_SIZE..(page + 1) * PAGE_SIZE].fill(0);
    }
    image[..SALT_SIZE].copy_from_slice(SQLITE_HEADER);
    image
}

/// Encrypt one plaintext page the way the container format stores it.
pub fn seal_page(
    plain: &[u8],
    index: u32,
    keys: &KeyContext,
    salt: [u8; SALT_SIZE],
    iv: [u8; 16],
) -> [u8; PAGE_SIZE] {
    let layout = PageLayout::for_index(index);
    let mut page = [0u8; PAGE_SIZE];
    if index == 0 {
        page[..SALT_SIZE].copy_from_slice(&salt);
    }

    let cipher = Aes256Enc::new(keys.enc_key().expose_secret().into());
    let mut previous = iv;
    let body = &plain[layout.cipher_range()];
    for (src, dst) in body
        .chunks_exact(16)
        .zip(page[layout.cipher_range()].chunks_exact_mut(16))
    {
        let mut mixed = [0u8; 16];
        xor_blocks(src, &previous, &mut mixed);
        let mut block = Block::from(mixed);
        cipher.encrypt_block(&mut block);
        dst.copy_from_slice(block.as_slice());
        previous.copy_from_slice(block.as_slice());
    }

    page[RESERVE_OFFSET..HMAC_OFFSET].copy_from_slice(&iv);
    let tag = compute_page_tag(
        keys.mac_key(),
        &page[layout.cipher_range()],
        &Iv16::new(iv),
        index,
    )
    .expect("tag");
    page[HMAC_OFFSET..].copy_from_slice(tag.expose_secret());
    page
}

/// Encrypt a whole plaintext image. All-zero pages stay all-zero.
pub fn seal_container(
    plain: &[u8],
    hex_key: &str,
    salt: [u8; SALT_SIZE],
    params: &KdfParams,
) -> Vec<u8> {
    assert_eq!(plain.len() % PAGE_SIZE, 0, "plaintext image must be whole pages");
    let keys = keys_for(hex_key, salt, params);
    let mut out = Vec::with_capacity(plain.len());
    for (index, page) in plain.chunks_exact(PAGE_SIZE).enumerate() {
        if index > 0 && page.iter().all(|&b| b == 0) {
            out.extend_from_slice(page);
            continue;
        }
        let iv: [u8; 16] = core::array::from_fn(|i| (index as u8).wrapping_mul(31) ^ (i as u8) ^ salt[i]);
        out.extend_from_slice(&seal_page(page, index as u32, &keys, salt, iv));
    }
    out
}

/// What decryption must produce for `plain` sealed into `sealed`: the
/// original bodies with each page's reserve region taken from the container.
pub fn expected_output(plain: &[u8], sealed: &[u8]) -> Vec<u8> {
    let mut expected = plain.to_vec();
    for (out, enc) in expected
        .chunks_exact_mut(PAGE_SIZE)
        .zip(sealed.chunks_exact(PAGE_SIZE))
    {
        if enc.iter().any(|&b| b != 0) {
            out[RESERVE_OFFSET..].copy_from_slice(&enc[RESERVE_OFFSET..]);
        }
    }
    expected[..SALT_SIZE].copy_from_slice(SQLITE_HEADER);
    expected
}

pub fn write_fixture(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).expect("write fixture");
    path
}

/// Sealed `pages`-page container on disk plus the plaintext it must decrypt to.
pub fn fixture(dir: &Path, name: &str, pages: usize, seed: u64, hex_key: &str) -> (PathBuf, Vec<u8>) {
    let mut salt = TEST_SALT;
    salt[0] ^= seed as u8;
    let plain = sample_plaintext(pages, seed, &[]);
    let sealed = seal_container(&plain, hex_key, salt, &TEST_KDF);
    let expected = expected_output(&plain, &sealed);
    (write_fixture(dir, name, &sealed), expected)
}
