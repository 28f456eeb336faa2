//! Distribution of the requested data fields over the virtual identities.
//!
//! Each identity sends one data message per cycle, so the aggregate field
//! mask is split into per-identity sub-masks that keep the encoded messages
//! about the same size. The split is always rebuilt from scratch: the same
//! mask and length function give the same assignment.

/// Upper bound on virtual identities a device emulates.
pub const MAX_VIRTUAL_DEVICES: usize = 4;

/// Split `fields` over `identities` virtual identities.
///
/// Bits are taken from least to most significant; each goes to the identity
/// whose current sub-mask encodes shortest according to `message_len`
/// (first identity on ties). `identities` is clamped to
/// `1..=MAX_VIRTUAL_DEVICES`; unused entries of the result are zero.
pub fn split_data_fields<F>(
    fields: u32,
    identities: usize,
    message_len: F,
) -> [u32; MAX_VIRTUAL_DEVICES]
where
    F: Fn(u32) -> usize,
{
    let identities = identities.clamp(1, MAX_VIRTUAL_DEVICES);
    let mut split = [0u32; MAX_VIRTUAL_DEVICES];

    for bit in (0..u32::BITS).map(|shift| 1u32 << shift) {
        if fields & bit == 0 {
            continue;
        }
        let mut target = 0;
        let mut shortest = usize::MAX;
        for (index, mask) in split[..identities].iter().enumerate() {
            let len = message_len(*mask);
            if len < shortest {
                shortest = len;
                target = index;
            }
        }
        split[target] |= bit;
    }

    split
}
