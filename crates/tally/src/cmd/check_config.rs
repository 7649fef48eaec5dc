//! Check-config command - parse, validate and print the effective settings

use std::path::Path;

use anyhow::Result;
use tally_config::{Config, SinkType};

/// Run the check-config command
pub fn run(path: Option<&Path>) -> Result<()> {
    let config = super::load_config(path)?;

    match path {
        Some(path) => println!("{}: ok\n", path.display()),
        None => println!("(default): ok\n"),
    }
    print!("{}", render(&config));
    Ok(())
}

fn duration(d: std::time::Duration) -> String {
    humantime::format_duration(d).to_string()
}

/// Effective settings, one `section.field = value` per line
fn render(config: &Config) -> String {
    let mut out = String::new();
    let mut line = |key: &str, value: String| {
        out.push_str(&format!("{:<24} = {}\n", key, value));
    };

    line("log.level", config.log.level.as_str().into());
    line("log.format", format!("{:?}", config.log.format).to_lowercase());
    line("log.output", format!("{:?}", config.log.output).to_lowercase());

    let writer = &config.writer;
    line("writer.workers", writer.workers.to_string());
    line("writer.insert_size", writer.insert_size.to_string());
    line("writer.transaction_size", writer.transaction_size.to_string());
    line("writer.idle_interval", duration(writer.idle_interval));
    line("writer.report_capacity", writer.report_capacity.to_string());
    line(
        "writer.shutdown_grace",
        writer
            .shutdown_grace
            .map(duration)
            .unwrap_or_else(|| "none".into()),
    );

    let sink = &config.sink;
    line("sink.type", sink.sink_type.as_str().into());
    if sink.sink_type == SinkType::Postgres {
        line("sink.url", sink.url.clone().unwrap_or_default());
        line(
            "sink.username",
            sink.username.clone().unwrap_or_else(|| "(from url)".into()),
        );
        line(
            "sink.password",
            if sink.password.is_some() { "***" } else { "(from url)" }.into(),
        );
        line("sink.connect_timeout", duration(sink.connect_timeout));
    }
    line("sink.schema", sink.schema.clone());
    line("sink.table_prefix", sink.table_prefix.clone());

    line("monitor.enabled", config.monitor.enabled.to_string());
    line("monitor.interval", duration(config.monitor.interval));

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_render_defaults() {
        let out = render(&Config::default());
        assert!(out.contains("writer.workers           = 3\n"));
        assert!(out.contains("writer.idle_interval     = 50ms\n"));
        assert!(out.contains("writer.shutdown_grace    = none\n"));
        assert!(out.contains("sink.type                = memory\n"));
        assert!(!out.contains("sink.url"));
    }

    #[test]
    fn test_render_hides_password() {
        let config = Config::from_str(
            "[sink]\ntype = \"postgres\"\nurl = \"postgres://db/x\"\npassword = \"hunter2\"",
        )
        .unwrap();
        let out = render(&config);
        assert!(out.contains("sink.url                 = postgres://db/x\n"));
        assert!(out.contains("sink.password            = ***\n"));
        assert!(!out.contains("hunter2"));
    }
}
