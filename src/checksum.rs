/// Running 8-bit arithmetic sum over the control, address and user data
/// octets of a frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct Checksum {
    sum: u8,
}

impl Checksum {
    pub const fn new() -> Checksum {
        Checksum { sum: 0 }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.sum = data.iter().fold(self.sum, |acc, b| acc.wrapping_add(*b));
    }

    pub fn finalize(self) -> u8 {
        self.sum
    }

    /// One-shot sum of several slices.
    pub fn of(parts: &[&[u8]]) -> u8 {
        let mut d = Checksum::new();
        for part in parts {
            d.update(part);
        }
        d.finalize()
    }
}
