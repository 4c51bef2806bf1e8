use anyhow::Result;
use serde_json::json;

use PhyloHistory::config::HistoryConfig;

use crate::util::read_json_arg;

pub fn exec(options: Option<&str>, json: bool) -> Result<()> {
    let opts = match options {
        Some(arg) => read_json_arg(arg)?,
        None => serde_json::Value::Null,
    };
    let cfg = HistoryConfig::from_env().merge_options(&opts)?;

    if json {
        let out = match &cfg {
            Some(c) => json!({
                "enabled": true,
                "collapsed": c.collapsed,
                "width_fraction": c.width_fraction,
                "collapsed_width": c.collapsed_width_px,
            }),
            None => json!({ "enabled": false }),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    match cfg {
        Some(c) => {
            println!("history: enabled");
            println!("  collapsed       = {}", c.collapsed);
            println!("  width_fraction  = {}", c.width_fraction);
            println!("  collapsed_width = {}px", c.collapsed_width_px);
        }
        None => println!("history: disabled"),
    }
    Ok(())
}
