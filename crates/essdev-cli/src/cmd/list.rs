use super::print_json;
use anyhow::Context;
use essdev_core::ops;
use std::path::Path;

pub fn run(file: &Path) -> anyhow::Result<()> {
    let names = ops::list(file)
        .with_context(|| format!("failed to list instances in {}", file.display()))?;
    print_json(&names)
}
