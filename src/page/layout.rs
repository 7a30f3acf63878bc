//! src/page/layout.rs

use crate::consts::{HMAC_OFFSET, HMAC_SIZE, PAGE_SIZE, RESERVE_OFFSET, SALT_SIZE};
use std::ops::Range;

/// Where things live inside one encrypted page.
///
/// ```text
/// page 0:  [ salt 16 | ciphertext 4000 | iv 16 | tag 64 ]
/// page N:  [          ciphertext 4016  | iv 16 | tag 64 ]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLayout {
    index: u32,
}

impl PageLayout {
    #[inline(always)]
    pub const fn for_index(index: u32) -> Self {
        Self { index }
    }

    #[inline(always)]
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// 1-based page number mixed into the tag.
    #[inline(always)]
    pub const fn page_number(&self) -> u32 {
        self.index.wrapping_add(1)
    }

    /// Leading bytes that are not ciphertext (the salt on page 0).
    #[inline(always)]
    pub const fn offset(&self) -> usize {
        if self.index == 0 {
            SALT_SIZE
        } else {
            0
        }
    }

    #[inline(always)]
    pub const fn cipher_range(&self) -> Range<usize> {
        self.offset()..RESERVE_OFFSET
    }

    #[inline(always)]
    pub const fn iv_range(&self) -> Range<usize> {
        RESERVE_OFFSET..HMAC_OFFSET
    }

    #[inline(always)]
    pub const fn tag_range(&self) -> Range<usize> {
        HMAC_OFFSET..HMAC_OFFSET + HMAC_SIZE
    }

    #[inline(always)]
    pub const fn reserve_range(&self) -> Range<usize> {
        RESERVE_OFFSET..PAGE_SIZE
    }

    /// Length of the decrypted body (equal to the ciphertext length, no padding).
    #[inline(always)]
    pub const fn body_len(&self) -> usize {
        RESERVE_OFFSET - self.offset()
    }

    /// Bytes [`decrypt_page`](crate::page::decrypt_page) writes for a non-sentinel page.
    #[inline(always)]
    pub const fn output_len(&self) -> usize {
        PAGE_SIZE - self.offset()
    }
}
