//! Engine-scoped accounting state (spec.md §3's "Accounting State").

/// Running subset/size-comparison state for a two-file comparison.
///
/// `subset1`/`subset2` start `true` and only ever decay to `false`
/// (spec.md §3, §9: never force them back to `true`, including on the
/// "one side exhausted" path). `procsz1`/`procsz2` count non-zero bytes
/// contributed by each file, at whatever granularity a given comparison
/// step discovers them (page-granular in the bulk path, byte-granular in
/// the byte-level finish).
#[derive(Debug, Clone, Copy, Default)]
pub struct Accounting {
    pub subset1: bool,
    pub subset2: bool,
    pub procsz1: u64,
    pub procsz2: u64,
}

impl Accounting {
    pub fn new() -> Self {
        Self {
            subset1: true,
            subset2: true,
            procsz1: 0,
            procsz2: 0,
        }
    }

    /// A block was all-zero in file 1 but not file 2: file 2 contributed
    /// `len` non-zero bytes the other side can't match with its own data,
    /// so file 2 is not a subset of file 1.
    pub fn zero_in_a(&mut self, len: u64) {
        self.procsz2 += len;
        self.subset2 = false;
    }

    /// Symmetric case: file 1 contributed non-zero bytes file 2 can't
    /// match.
    pub fn zero_in_b(&mut self, len: u64) {
        self.procsz1 += len;
        self.subset1 = false;
    }
}
