use anyhow::Context;
use essdev_core::dispatch::DispatchSettings;
use essdev_core::ops::{self, EditOptions};
use std::path::Path;

pub fn run(
    file: &Path,
    instance: &str,
    options: &EditOptions,
    settings: &DispatchSettings,
) -> anyhow::Result<()> {
    let outcome = ops::delete(file, instance, options, settings)
        .with_context(|| format!("failed to delete instance '{instance}'"))?;
    super::report(&outcome)
}
