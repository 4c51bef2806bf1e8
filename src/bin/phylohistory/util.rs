use anyhow::{anyhow, Context, Result};
use std::fs::OpenOptions;
use std::io::Read;
use std::path::PathBuf;

/// Read a textual argument: "-" = stdin, "@path" = file, otherwise literal.
pub fn read_text_arg(arg: &str) -> Result<String> {
    if arg == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("read stdin")?;
        return Ok(buf);
    }
    if let Some(p) = arg.strip_prefix('@') {
        let path = PathBuf::from(p);
        let mut f = OpenOptions::new()
            .read(true)
            .open(&path)
            .map_err(|e| anyhow!("open {}: {}", path.display(), e))?;
        let mut buf = String::new();
        f.read_to_string(&mut buf)
            .with_context(|| format!("read {}", path.display()))?;
        return Ok(buf);
    }
    Ok(arg.to_string())
}

fn arg_source(arg: &str) -> &'static str {
    if arg == "-" {
        "stdin"
    } else if arg.starts_with('@') {
        "file"
    } else {
        "literal"
    }
}

/// Parse a JSON argument (same sources as read_text_arg).
pub fn read_json_arg(arg: &str) -> Result<serde_json::Value> {
    let text = read_text_arg(arg)?;
    serde_json::from_str(&text).with_context(|| format!("parse JSON ({})", arg_source(arg)))
}
