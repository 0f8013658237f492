/// Largest single read a scanner issues; bigger ranges are split recursively.
pub const MAX_READ_LEN: usize = 2 << 18;

/// Size of the backward probe used to snap a worker boundary onto a newline.
pub const PROBE_LEN: usize = 2 << 8;

/// Initial slot count of an aggregation table.
pub const TABLE_CAPACITY: usize = 1 << 14;

pub const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
pub const FNV_PRIME: u32 = 16_777_619;

/// Shortest well-formed record, `A;0.0\n`.
pub const MIN_RECORD_LEN: usize = b"A;0.0\n".len();

/// Per-run overrides of the module constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanConfig {
    pub max_read_len: usize,
    pub probe_len: usize,
    pub table_capacity: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_read_len: MAX_READ_LEN,
            probe_len: PROBE_LEN,
            table_capacity: TABLE_CAPACITY,
        }
    }
}

impl ScanConfig {
    pub fn with_max_read_len(mut self, max_read_len: usize) -> Self {
        self.max_read_len = max_read_len.max(MIN_RECORD_LEN);
        self
    }

    pub fn with_probe_len(mut self, probe_len: usize) -> Self {
        self.probe_len = probe_len.max(1);
        self
    }

    pub fn with_table_capacity(mut self, table_capacity: usize) -> Self {
        self.table_capacity = table_capacity;
        self
    }
}
