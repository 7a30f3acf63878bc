// benches/decrypt.rs
//! Page decryption throughput (pre-encrypted pages, keys derived once)

use aes::cipher::{BlockEncrypt, KeyInit};
use aes::{Aes256Enc, Block};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use wxdb_rs::aliases::{Aes256Key32, Iv16, MacKey32};
use wxdb_rs::consts::{HMAC_OFFSET, PAGE_SIZE, RESERVE_OFFSET};
use wxdb_rs::page::{compute_page_tag, PageLayout};
use wxdb_rs::utils::xor_blocks;
use wxdb_rs::{decrypt_page, KeyContext};

// --- Size constants ---
const KB: usize = 1024;
const MB: usize = 1024 * 1024;

fn format_size(bytes: usize) -> String {
    if bytes >= MB {
        format!("{} MiB", bytes / MB)
    } else {
        format!("{} KiB", bytes / KB)
    }
}

fn keys() -> KeyContext {
    KeyContext::from_parts(Aes256Key32::new([0x11; 32]), MacKey32::new([0x22; 32]))
}

fn seal(index: u32, keys: &KeyContext) -> [u8; PAGE_SIZE] {
    let layout = PageLayout::for_index(index);
    let mut page = [0x41u8; PAGE_SIZE]; // Repeating 'A'
    let iv = [index as u8; 16];
    let cipher = Aes256Enc::new(keys.enc_key().expose_secret().into());
    let mut previous = iv;
    for chunk in page[layout.cipher_range()].chunks_exact_mut(16) {
        let mut mixed = [0u8; 16];
        xor_blocks(chunk, &previous, &mut mixed);
        let mut block = Block::from(mixed);
        cipher.encrypt_block(&mut block);
        chunk.copy_from_slice(block.as_slice());
        previous.copy_from_slice(block.as_slice());
    }
    page[RESERVE_OFFSET..HMAC_OFFSET].copy_from_slice(&iv);
    let tag = compute_page_tag(keys.mac_key(), &page[layout.cipher_range()], &Iv16::new(iv), index).unwrap();
    page[HMAC_OFFSET..].copy_from_slice(tag.expose_secret());
    page
}

fn bench_decrypt(c: &mut Criterion) {
    let mut group = c.benchmark_group("decrypt");
    let keys = keys();

    for &size in &[64 * KB, MB, 16 * MB] {
        // --- Pre-encrypt once (outside the timed loop) ---
        let pages: Vec<_> = (1..=(size / PAGE_SIZE) as u32).map(|i| seal(i, &keys)).collect();

        group.throughput(Throughput::Bytes(size as u64));
        for (label, validate) in [("first-page", false), ("all-pages", true)] {
            group.bench_with_input(BenchmarkId::new(label, format_size(size)), &size, |b, _| {
                let mut out = [0u8; PAGE_SIZE];
                b.iter(|| {
                    for (i, page) in pages.iter().enumerate() {
                        decrypt_page(black_box(page), &keys, i as u32 + 1, validate, &mut out).unwrap();
                    }
                    black_box(&out);
                });
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_decrypt);
criterion_main!(benches);
