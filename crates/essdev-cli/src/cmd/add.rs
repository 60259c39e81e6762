use anyhow::Context;
use essdev_core::dispatch::DispatchSettings;
use essdev_core::ops::{self, EditOptions, NewInstance};
use std::path::Path;

pub fn run(
    file: &Path,
    instance: NewInstance,
    options: &EditOptions,
    settings: &DispatchSettings,
) -> anyhow::Result<()> {
    let outcome = ops::add(file, &instance, options, settings)
        .with_context(|| format!("failed to add instance '{}'", instance.name))?;
    super::report(&outcome)
}
