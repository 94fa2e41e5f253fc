use comfy_table::{ContentArrangement, Table, presets::NOTHING};
use fio::Metrics;

pub const HEADER: [&str; 9] = [
    "Name",
    "Executor",
    "B/W (read)",
    "B/W (write)",
    "I/O (read)",
    "I/O (write)",
    "Latency (read)",
    "Latency (write)",
    "Latency (sync)",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub benchmark: String,
    pub executor: String,
    pub metrics: Metrics,
}

impl ReportRow {
    fn cells(&self) -> [&str; 9] {
        let m = &self.metrics;
        [
            &self.benchmark,
            &self.executor,
            &m.read_bandwidth,
            &m.write_bandwidth,
            &m.read_iops,
            &m.write_iops,
            &m.read_latency,
            &m.write_latency,
            &m.sync_latency,
        ]
    }
}

/// Results of a run, one row per benchmark and executor in the order they ran
#[derive(Debug, Default)]
pub struct Report {
    rows: Vec<ReportRow>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(&mut self, row: ReportRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    /// Borderless table with every column as wide as its widest cell
    pub fn render(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(NOTHING)
            .set_content_arrangement(ContentArrangement::Disabled)
            .set_header(HEADER);
        for row in &self.rows {
            table.add_row(row.cells());
        }

        table
            .lines()
            .map(|line| line.trim_end().to_owned())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
