use log::debug;

use crate::config::{NIBBLE_BITS, SysConfig};
use crate::error::SimError;
use crate::pcb::Pcb;

/// Bits needed to index `n` items: the bit length of `n - 1`, never less than 1.
#[inline]
pub fn bits_required(n: u64) -> u32 {
    if n <= 1 {
        1
    } else {
        u64::BITS - (n - 1).leading_zeros()
    }
}

/// Pages needed to hold `words` words.
#[inline]
pub fn pages_for(words: u64, page_size: u64) -> usize {
    words.div_ceil(page_size) as usize
}

/// A logical address split into page number and offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalAddress {
    pub raw: u64,
    pub page: u64,
    pub offset: u64,
}

impl LogicalAddress {
    /// Split `raw` with the low `offset_bits` as the offset. Anything above
    /// belongs to the page number, so oversized inputs land on an
    /// out-of-range page rather than wrapping.
    pub fn from_raw(raw: u64, offset_bits: u32) -> Self {
        let mask = (1u64 << offset_bits) - 1;
        LogicalAddress {
            raw,
            page: raw >> offset_bits,
            offset: raw & mask,
        }
    }

    /// Parse the operator's hex spelling. Empty or non-hex input is rejected.
    pub fn parse_hex(location: &str, offset_bits: u32) -> Result<Self, SimError> {
        if location.is_empty() || !location.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(SimError::InvalidAddress(location.to_string()));
        }
        let raw = u64::from_str_radix(location, 16)
            .map_err(|_| SimError::InvalidAddress(location.to_string()))?;
        Ok(Self::from_raw(raw, offset_bits))
    }
}

/// A physical address and the bit width it is rendered at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalAddress {
    pub value: u64,
    pub bits: u32,
}

impl PhysicalAddress {
    /// Number of hex digits. The width is padded up to the next nibble
    /// boundary; an already aligned width still gains a full nibble.
    pub fn hex_digits(&self) -> usize {
        ((self.bits + NIBBLE_BITS - self.bits % NIBBLE_BITS) / NIBBLE_BITS) as usize
    }
}

impl std::fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:0width$x}", self.value, width = self.hex_digits())
    }
}

/// Field widths used to translate addresses for one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressLayout {
    pub page_bits: u32,
    pub offset_bits: u32,
    pub frame_bits: u32,
}

impl AddressLayout {
    pub fn for_process(pcb: &Pcb, cfg: &SysConfig) -> Self {
        AddressLayout {
            page_bits: bits_required(pages_for(pcb.memsize(), cfg.page_size()) as u64),
            offset_bits: bits_required(cfg.page_size()),
            frame_bits: bits_required(cfg.frame_count() as u64),
        }
    }

    pub fn physical_bits(&self) -> u32 {
        self.frame_bits + self.offset_bits
    }
}

/// Translate a hex logical address for a resident process.
///
/// The frame index is placed above the untouched offset bits. Fails with
/// [`SimError::InvalidAddress`] when the page number is past the end of the
/// process's page table; there is no demand paging to fall back on.
/// Addresses wider than the page and offset fields are rejected, never truncated.
pub fn translate(location: &str, pcb: &Pcb, cfg: &SysConfig) -> Result<PhysicalAddress, SimError> {
    let layout = AddressLayout::for_process(pcb, cfg);
    let la = LogicalAddress::parse_hex(location, layout.offset_bits)?;

    let frame = usize::try_from(la.page)
        .ok()
        .and_then(|page| pcb.page_table().get(page))
        .copied()
        .ok_or_else(|| SimError::InvalidAddress(location.to_string()))?;

    let pa = PhysicalAddress {
        value: ((frame as u64) << layout.offset_bits) | la.offset,
        bits: layout.physical_bits(),
    };
    debug!(
        "pid {}: {} (page={}, offset={}) -> frame {} = {}",
        pcb.pid(),
        location,
        la.page,
        la.offset,
        frame,
        pa
    );
    Ok(pa)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcb::Pid;

    fn resident(memsize: u64, frames: &[usize]) -> Pcb {
        let mut pcb = Pcb::new(Pid(0), memsize);
        pcb.set_page_table(frames.to_vec());
        pcb
    }

    #[test]
    fn test_bits_required() {
        assert_eq!(bits_required(0), 1);
        assert_eq!(bits_required(1), 1);
        assert_eq!(bits_required(2), 1);
        assert_eq!(bits_required(3), 2);
        assert_eq!(bits_required(4), 2);
        assert_eq!(bits_required(5), 3);
        assert_eq!(bits_required(16), 4);
        assert_eq!(bits_required(17), 5);
    }

    #[test]
    fn test_pages_for() {
        assert_eq!(pages_for(0, 10), 0);
        assert_eq!(pages_for(1, 10), 1);
        assert_eq!(pages_for(10, 10), 1);
        assert_eq!(pages_for(11, 10), 2);
        assert_eq!(pages_for(40, 16), 3);
    }

    #[test]
    fn test_logical_decomposition() {
        let la = LogicalAddress::from_raw(0x25, 4);
        assert_eq!(la.page, 2);
        assert_eq!(la.offset, 5);

        let la = LogicalAddress::from_raw(0b1_0111, 3);
        assert_eq!(la.page, 2);
        assert_eq!(la.offset, 7);
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert!(LogicalAddress::parse_hex("", 4).is_err());
        assert!(LogicalAddress::parse_hex("xyz", 4).is_err());
        assert!(LogicalAddress::parse_hex("+1", 4).is_err());
        assert!(LogicalAddress::parse_hex("1ffffffffffffffff", 4).is_err());
        assert_eq!(LogicalAddress::parse_hex("Ff", 4).unwrap().raw, 0xff);
    }

    // 16 words per page, 256 words of memory: 16 frames, 4 frame bits, 4 offset bits.
    fn sixteen_frames() -> SysConfig {
        SysConfig::new(1, vec![], 1, 5, 16, 256).unwrap()
    }

    #[test]
    fn test_translate_known_addresses() {
        let cfg = sixteen_frames();
        let pcb = resident(40, &[5, 9, 2]);

        assert_eq!(translate("0", &pcb, &cfg).unwrap().to_string(), "050");
        assert_eq!(translate("1a", &pcb, &cfg).unwrap().to_string(), "09a");
        assert_eq!(translate("25", &pcb, &cfg).unwrap().to_string(), "025");
        assert_eq!(translate("2F", &pcb, &cfg).unwrap().to_string(), "02f");
    }

    #[test]
    fn test_aligned_width_gains_a_nibble() {
        // 4 frame bits + 4 offset bits = 8 bits, padded to 12
        let pa = translate("0", &resident(40, &[5, 9, 2]), &sixteen_frames()).unwrap();
        assert_eq!(pa.bits, 8);
        assert_eq!(pa.hex_digits(), 3);
        assert_eq!(pa.to_string(), "050");

        assert_eq!(PhysicalAddress { value: 1, bits: 4 }.to_string(), "01");
        assert_eq!(PhysicalAddress { value: 1, bits: 5 }.to_string(), "01");
        assert_eq!(PhysicalAddress { value: 1, bits: 7 }.to_string(), "01");
        assert_eq!(PhysicalAddress { value: 0xabc, bits: 12 }.to_string(), "0abc");
    }

    #[test]
    fn test_overlong_address_is_rejected() {
        // 3 pages need 2 page bits; "1a0" carries page 0x1a, past the table
        let cfg = sixteen_frames();
        let pcb = resident(40, &[5, 9, 2]);
        assert_eq!(
            translate("1a0", &pcb, &cfg),
            Err(SimError::InvalidAddress("1a0".to_string()))
        );
        assert_eq!(translate("010", &pcb, &cfg).unwrap().to_string(), "090");
    }

    #[test]
    fn test_translate_page_out_of_range() {
        let cfg = sixteen_frames();
        let pcb = resident(40, &[5, 9, 2]);

        assert_eq!(
            translate("30", &pcb, &cfg),
            Err(SimError::InvalidAddress("30".to_string()))
        );
        assert!(translate("fff", &pcb, &cfg).is_err());
    }

    #[test]
    fn test_translate_pads_to_nibble() {
        // 4-word pages, 8 frames: 3 frame bits + 2 offset bits = 5 bits -> 2 digits
        let cfg = SysConfig::new(1, vec![], 1, 5, 4, 32).unwrap();
        let pcb = resident(8, &[1, 6]);

        let pa = translate("3", &pcb, &cfg).unwrap();
        assert_eq!(pa.bits, 5);
        assert_eq!(pa.value, 0b001_11);
        assert_eq!(pa.to_string(), "07");

        let pa = translate("5", &pcb, &cfg).unwrap();
        assert_eq!(pa.value, 0b110_01);
        assert_eq!(pa.to_string(), "19");
    }

    #[test]
    fn test_translate_without_pages_always_fails() {
        let cfg = sixteen_frames();
        let pcb = resident(0, &[]);
        assert!(translate("0", &pcb, &cfg).is_err());
    }

    #[test]
    fn test_translate_round_trip() {
        for &(page_size, mem_size) in &[(1u64, 8u64), (4, 32), (8, 64), (16, 256), (32, 96)] {
            let cfg = SysConfig::new(0, vec![], 0, 1, page_size, mem_size).unwrap();
            let frames = cfg.frame_count();
            let offset_bits = bits_required(page_size);

            for pages in 1..=frames.min(4) {
                // reverse order so page and frame numbers differ
                let table: Vec<usize> = (0..pages).map(|p| frames - 1 - p).collect();
                let pcb = resident(pages as u64 * page_size, &table);

                for page in 0..pages as u64 {
                    for offset in 0..page_size {
                        let logical = (page << offset_bits) | offset;
                        let pa = translate(&format!("{:x}", logical), &pcb, &cfg).unwrap();

                        assert_eq!(pa.value >> offset_bits, table[page as usize] as u64);
                        assert_eq!(pa.value & ((1 << offset_bits) - 1), offset);
                        assert_eq!(pa.to_string().len(), pa.hex_digits());
                        // same input, same output
                        assert_eq!(translate(&format!("{:x}", logical), &pcb, &cfg), Ok(pa));
                    }
                }
            }
        }
    }
}
