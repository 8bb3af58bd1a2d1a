//! FITS layout limits that constrain what a DXU definition may declare.

/// FITS block size in bytes (each logical record is one block).
pub const BLOCK_SIZE: usize = 2880;

/// FITS card (keyword record) size in bytes.
pub const CARD_SIZE: usize = 80;

/// Number of cards that fit in a single block.
pub const CARDS_PER_BLOCK: usize = BLOCK_SIZE / CARD_SIZE;

/// Padding byte used for header blocks (ASCII space).
pub const HEADER_PAD_BYTE: u8 = 0x20;

/// Maximum length of a keyword name.
pub const KEYWORD_LEN: usize = 8;

/// Longest character string that fits in a single card value
/// (70 value bytes minus the two quotes).
pub const MAX_STRING_VALUE_LEN: usize = 68;

/// Largest number of columns a binary table may declare (`TFIELDS`).
pub const MAX_TFIELDS: usize = 999;

/// Returns the number of FITS blocks required to hold `num_bytes` bytes.
///
/// 0 bytes requires 0 blocks, 1 byte requires 1 block, 2881 bytes
/// requires 2 blocks.
pub const fn blocks_needed(num_bytes: usize) -> usize {
    if num_bytes == 0 {
        return 0;
    }
    num_bytes.div_ceil(BLOCK_SIZE)
}

/// Returns the total byte length (in whole blocks) required to hold `num_bytes`.
pub const fn padded_byte_len(num_bytes: usize) -> usize {
    blocks_needed(num_bytes) * BLOCK_SIZE
}

/// Number of header blocks needed for `num_cards` cards plus the END card.
pub const fn header_blocks_for_cards(num_cards: usize) -> usize {
    (num_cards + 1).div_ceil(CARDS_PER_BLOCK)
}
