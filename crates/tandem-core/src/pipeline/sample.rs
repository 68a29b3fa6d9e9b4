use std::fmt::Write as _;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

const SEVERITIES: [&str; 4] = ["DEBUG", "INFO", "WARN", "ERROR"];
const METHODS: [&str; 4] = ["GET", "POST", "PUT", "DELETE"];
const PATHS: [&str; 6] = [
    "/",
    "/index.html",
    "/api/users",
    "/api/orders",
    "/static/app.js",
    "/health",
];
const STATUSES: [u16; 6] = [200, 201, 204, 301, 404, 500];
const MESSAGES: [&str; 8] = [
    "Database connection established",
    "Database connection failed",
    "Cache miss for session key",
    "User authentication succeeded",
    "Request timed out after 30s",
    "Configuration reloaded",
    "Disk usage above threshold",
    "Background job completed",
];

// One comment line per this many entries, on average.
const COMMENT_EVERY: u32 = 25;

/// Synthetic log text with the number of records it should yield.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleLog {
    pub text: String,
    /// Lines that parse into a record.
    pub expected_records: usize,
    /// `#` lines, which the parser skips.
    pub comment_lines: usize,
}

/// Generates mixed error-log and access-log text.
///
/// With a seed the output is reproducible.
#[derive(Debug)]
pub struct SampleLogGenerator {
    rng: StdRng,
}

impl SampleLogGenerator {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    /// Draws an entry count from the CLI's default range.
    pub fn entry_count(&mut self) -> usize {
        self.rng.gen_range(500..1000)
    }

    pub fn generate(&mut self, entries: usize) -> SampleLog {
        let mut text = String::with_capacity(entries * 80);
        let mut comment_lines = 1;
        text.push_str("# synthetic log sample\n");

        for index in 0..entries {
            if self.rng.gen_ratio(1, COMMENT_EVERY) {
                let _ = writeln!(text, "# marker {index}");
                comment_lines += 1;
            }

            let second = index % 60;
            let minute = (index / 60) % 60;
            if self.rng.gen_bool(0.6) {
                let level = SEVERITIES[self.rng.gen_range(0..SEVERITIES.len())];
                let message = MESSAGES[self.rng.gen_range(0..MESSAGES.len())];
                let _ = writeln!(
                    text,
                    "[2024-01-15 10:{minute:02}:{second:02}] [{level}] {message}"
                );
            } else {
                let method = METHODS[self.rng.gen_range(0..METHODS.len())];
                let path = PATHS[self.rng.gen_range(0..PATHS.len())];
                let status = STATUSES[self.rng.gen_range(0..STATUSES.len())];
                let size = self.rng.gen_range(0..10_000u32);
                let host = self.rng.gen_range(1..255u8);
                let _ = writeln!(
                    text,
                    "192.168.1.{host} - - [15/Jan/2024:10:{minute:02}:{second:02} +0000] \"{method} {path} HTTP/1.1\" {status} {size}"
                );
            }
        }

        SampleLog {
            text,
            expected_records: entries,
            comment_lines,
        }
    }
}
