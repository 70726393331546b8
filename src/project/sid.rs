//! Session ids for behavior attachments.

use std::collections::HashSet;

use rand::Rng;

/// Upper bound (exclusive) of generated sids, matching the range the
/// editor itself produces.
pub const SID_UPPER_BOUND: u64 = 1_000_000_000_000_000;

/// Generates random sids that never repeat within one generator.
///
/// One generator is used per migration call, so every attachment created
/// by that call gets its own sid.
#[derive(Debug, Default)]
pub struct SidGenerator {
    issued: HashSet<u64>,
}

impl SidGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_sid(&mut self) -> u64 {
        let mut rng = rand::thread_rng();
        loop {
            let sid = rng.gen_range(0..SID_UPPER_BOUND);
            if self.issued.insert(sid) {
                return sid;
            }
        }
    }

    /// Sids handed out so far.
    pub fn issued(&self) -> usize {
        self.issued.len()
    }
}
