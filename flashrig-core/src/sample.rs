/// One pulled sample: a wall-clock timestamp (seconds since the Unix epoch)
/// and the full channel vector. Persisted as one comma-joined line.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRecord {
    pub timestamp: f64,
    pub values: Vec<f64>,
}

impl SampleRecord {
    pub fn new(timestamp: f64, values: Vec<f64>) -> Self {
        Self { timestamp, values }
    }

    /// `timestamp,v1,v2,...`, readable back as a plain csv row.
    pub fn to_line(&self) -> String {
        let mut line = self.timestamp.to_string();
        for v in &self.values {
            line.push(',');
            line.push_str(&v.to_string());
        }
        line
    }

    pub fn parse_line(line: &str) -> Option<Self> {
        let mut fields = line.trim().split(',');
        let timestamp = fields.next()?.trim().parse().ok()?;
        let mut values = Vec::new();
        for field in fields {
            values.push(field.trim().parse().ok()?);
        }
        Some(Self { timestamp, values })
    }
}
