use crate::models::PortfolioLine;
use serde_json::{Map, Value};
use std::io::{self, Write};

/// Writes results in the order they were produced
pub struct Reporter<W: Write> {
    out: W,
}

impl Reporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// One line per holding, absent fields shown as `-`
    pub fn report_lines(&mut self, lines: &[PortfolioLine]) -> io::Result<()> {
        for line in lines {
            let text = format_line(line);
            log::info!("{}", text);
            writeln!(self.out, "{}", text)?;
        }

        let summary = format!("{} holding(s)", lines.len());
        log::info!("{}", summary);
        writeln!(self.out, "{}", summary)?;
        self.out.flush()
    }

    /// The decoded API response, as-is
    pub fn report_json(&mut self, data: &Map<String, Value>) -> io::Result<()> {
        let pretty = serde_json::to_string_pretty(data).map_err(io::Error::other)?;
        log::info!("Response data: {}", pretty);
        writeln!(self.out, "Response Data:")?;
        writeln!(self.out, "{}", pretty)?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

pub fn format_line(line: &PortfolioLine) -> String {
    let field = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    let plan = match line.savings_plan {
        Some(true) => "yes",
        Some(false) => "no",
        None => "-",
    };

    format!(
        "{} | {} | value: {} | shares: {} | price: {} | savings plan: {}",
        line.name,
        line.isin,
        field(&line.value),
        field(&line.shares),
        field(&line.price),
        plan
    )
}
